/// Scheduled validation of S3 backup buckets
///
/// Bucket policies come from the `BUCKETS_TO_MONITOR` env var, a `;`-separated
/// list of `bucket,retention_days,regexp,start_day,tolerance` entries where
/// the last three accept the sentinels `NoRegexp`, `NoStartDay` and
/// `NoTolerance`. Every bucket is expected to hold one backup per day within
/// the retention window, with sane key names, non-empty files and a bounded
/// day-over-day size growth.
use chrono::{Duration, NaiveDate, Utc};
use futures::future::join_all;
use lambda_runtime::{Error, LambdaEvent};
use regex::Regex;
use relay_core::error::RelayError;
use relay_core::handlers::{action, EventHandler};
use relay_core::models::InvocationContext;
use relay_core::response::Response;
use relay_core::services::lambda::{FunctionService, InvokeType, LambdaFunctionService};
use relay_core::services::s3::{ObjectStore, ObjectSummary, S3ObjectStore};
use relay_core::utils::env_var;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

const NO_REGEXP: &str = "NoRegexp";
const NO_START_DAY: &str = "NoStartDay";
const NO_TOLERANCE: &str = "NoTolerance";

/// How one backup bucket is expected to behave
#[derive(Debug, Clone)]
pub struct BucketPolicy {
    pub bucket_name: String,
    pub retention_days: i64,
    pub name_pattern: Option<Regex>,
    pub start_day: Option<NaiveDate>,
    pub size_tolerance_percent: Option<i64>,
}

/// Parses the `BUCKETS_TO_MONITOR` value into per-bucket policies
pub fn parse_policies(raw: &str) -> Result<Vec<BucketPolicy>, RelayError> {
    raw.split(';')
        .filter(|entry| !entry.trim().is_empty())
        .map(parse_policy)
        .collect()
}

fn parse_policy(entry: &str) -> Result<BucketPolicy, RelayError> {
    let fields: Vec<&str> = entry.trim().split(',').collect();
    let [bucket_name, retention, regexp, start_day, tolerance] = fields[..] else {
        return Err(RelayError::with_status(
            format!("Invalid bucket config entry '{}': expected 5 fields", entry),
            500,
        ));
    };

    let retention_days = retention.parse().map_err(|err| {
        RelayError::with_status(
            format!("Invalid retention_days: expected positive integer, got {}", err),
            500,
        )
    })?;

    let name_pattern = match regexp {
        NO_REGEXP => None,
        pattern => Some(Regex::new(pattern).map_err(|err| {
            RelayError::with_status(format!("Invalid key regexp '{}': {}", pattern, err), 500)
        })?),
    };

    let start_day = match start_day {
        NO_START_DAY => None,
        day => Some(day.parse().map_err(|err| {
            RelayError::with_status(
                format!("{}: Invalid `start_day` argument: {}", bucket_name, err),
                500,
            )
        })?),
    };

    let size_tolerance_percent = match tolerance {
        NO_TOLERANCE => None,
        percent => Some(percent.parse().map_err(|err| {
            RelayError::with_status(format!("Invalid tolerance '{}': {}", percent, err), 500)
        })?),
    };

    Ok(BucketPolicy {
        bucket_name: bucket_name.to_string(),
        retention_days,
        name_pattern,
        start_day,
        size_tolerance_percent,
    })
}

/// Expected backup count and the date of the first expected key.
///
/// New buckets with a `start_day` inside the retention window hold fewer
/// backups than `retention_days` until the window fills up.
fn expected_values(
    policy: &BucketPolicy,
    today: NaiveDate,
) -> Result<(usize, NaiveDate), RelayError> {
    if policy.retention_days <= 0 {
        return Err(RelayError::with_status(
            format!(
                "Invalid retention_days: expected positive integer, got {}",
                policy.retention_days
            ),
            500,
        ));
    }

    let start_day = policy
        .start_day
        .unwrap_or_else(|| today - Duration::days(policy.retention_days));

    if start_day > today {
        return Err(RelayError::with_status(
            format!(
                "{}: Wrong start day: {} is in the future",
                policy.bucket_name, start_day
            ),
            500,
        ));
    }

    let expected = policy.retention_days.min((today - start_day).num_days() + 1);
    let first_expected = if expected < policy.retention_days {
        start_day
    } else {
        today - Duration::days(policy.retention_days - 1)
    };

    debug!(
        bucket = %policy.bucket_name, expected, %first_expected,
        "Computed expected backup window"
    );

    Ok((expected as usize, first_expected))
}

/// One key per day, matching the pattern, non-empty, growth within tolerance
fn validate_keys(
    policy: &BucketPolicy,
    keys: &[ObjectSummary],
    first_expected: NaiveDate,
) -> Result<(), RelayError> {
    let mut previous_size = 0;
    let mut check_day = first_expected;

    for (iteration, item) in keys.iter().enumerate() {
        if let Some(pattern) = &policy.name_pattern {
            if !pattern.is_match(&item.key) {
                return Err(RelayError::handled(format!(
                    "Key {} doesn't match regexp {}",
                    item.key, pattern
                )));
            }
        }

        let actual = item.last_modified.date_naive();
        if actual != check_day {
            return Err(RelayError::handled(format!(
                "Wrong key {}: expected date {}, got {}",
                item.key, check_day, actual
            )));
        }

        if item.size == 0 {
            return Err(RelayError::handled(format!("{} key is empty", item.key)));
        }

        if let Some(tolerance) = policy.size_tolerance_percent {
            if iteration > 0 {
                let size_diff = item.size - previous_size;
                let variation = (size_diff as f64 / item.size as f64 * 100.0).round() as i64;

                debug!(
                    key = %item.key, size_diff, variation,
                    "Size variation compared to previous backup"
                );

                if variation > tolerance {
                    return Err(RelayError::handled(format!(
                        "Size difference compared to previous backup for key {} \
                         above threshold of {} percent",
                        item.key, tolerance
                    )));
                }
            }
        }

        previous_size = item.size;
        check_day += Duration::days(1);
    }

    Ok(())
}

/// Validates a single bucket against its policy
pub async fn check_bucket(
    store: &dyn ObjectStore,
    policy: &BucketPolicy,
    today: NaiveDate,
) -> Result<String, RelayError> {
    let (expected, first_expected) = expected_values(policy, today)?;

    let mut content = store.list_bucket(&policy.bucket_name).await?;

    if content.len() < expected {
        return Err(RelayError::handled(format!(
            "{}: Invalid backups number. Expected at least {}, got {}",
            policy.bucket_name,
            expected,
            content.len()
        )));
    }

    if content.len() > expected {
        // Lifecycle policies expire keys at unpredictable times of day, so
        // tolerate up to 2 not-yet-expired leftovers and skip them.
        let leftovers = content.len() - expected;
        if leftovers > 2 {
            return Err(RelayError::handled(format!(
                "{}: Invalid backups number. Expected at most {}, got {}",
                policy.bucket_name,
                expected + 2,
                content.len()
            )));
        }

        info!(
            bucket = %policy.bucket_name, leftovers,
            "Ignoring oldest not-yet-expired key(s)"
        );
        content.drain(..leftovers);
    }

    validate_keys(policy, &content, first_expected)?;

    Ok(format!("{}: OK", policy.bucket_name))
}

/// Checks every configured bucket concurrently and alerts on any failure.
///
/// Per-bucket failures are reported in the output instead of failing the
/// invocation, so one broken bucket never hides the state of the others.
pub async fn check_backup_buckets(
    store: &dyn ObjectStore,
    functions: &dyn FunctionService,
    notifications_function: &str,
    policies: &[BucketPolicy],
    today: NaiveDate,
) -> Result<Value, RelayError> {
    let jobs = policies
        .iter()
        .map(|policy| check_bucket(store, policy, today));

    let mut output = Vec::with_capacity(policies.len());
    let mut errors = false;

    for result in join_all(jobs).await {
        match result {
            Ok(report) => output.push(report),
            Err(err) => {
                warn!(error = %err, "Backup bucket check failed");
                output.push(err.to_string());
                errors = true;
            }
        }
    }

    if errors {
        info!(function = %notifications_function, "Sending alert notification");
        functions
            .invoke(
                notifications_function,
                &json!({
                    "title": "backups_monitor: errors",
                    "payload": output.join("\n"),
                }),
                InvokeType::RequestResponse,
            )
            .await?;
    }

    Ok(json!(output))
}

/// Lambda entry point
pub async fn handler(event: LambdaEvent<Value>) -> Result<Response, Error> {
    let aws_config = aws_config::load_from_env().await;
    let store: Arc<dyn ObjectStore> =
        Arc::new(S3ObjectStore::new(aws_sdk_s3::Client::new(&aws_config)));
    let functions: Arc<dyn FunctionService> = Arc::new(LambdaFunctionService::new(
        aws_sdk_lambda::Client::new(&aws_config),
    ));
    let invocation = InvocationContext::from_env();

    let handler = EventHandler::new(
        "backups_monitor",
        event.payload,
        &invocation,
        action(move |_event| {
            let store = store.clone();
            let functions = functions.clone();
            async move {
                let policies = parse_policies(&env_var("BUCKETS_TO_MONITOR")?)?;
                let notifications_function = env_var("LAMBDA_NOTIFICATIONS")?;
                check_backup_buckets(
                    store.as_ref(),
                    functions.as_ref(),
                    &notifications_function,
                    &policies,
                    Utc::now().date_naive(),
                )
                .await
            }
        }),
    );

    handler.respond().await.map_err(Into::into)
}
