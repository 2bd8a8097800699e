/// Read-only metadata about the current Lambda invocation
///
/// Built once per invocation from the runtime environment and never mutated.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub function_name: String,
    pub function_version: String,
}

impl InvocationContext {
    pub fn new(function_name: impl Into<String>, function_version: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            function_version: function_version.into(),
        }
    }

    /// Reads the standard Lambda runtime environment variables
    pub fn from_env() -> Self {
        Self {
            function_name: std::env::var("AWS_LAMBDA_FUNCTION_NAME")
                .unwrap_or_else(|_| "unknown".to_string()),
            function_version: std::env::var("AWS_LAMBDA_FUNCTION_VERSION")
                .unwrap_or_else(|_| "$LATEST".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_context() {
        let ctx = InvocationContext::new("api", "3");
        assert_eq!(ctx.function_name, "api");
        assert_eq!(ctx.function_version, "3");
    }
}
