/// Thin clients for the external collaborators of the relay functions
///
/// Each service is a small trait with an AWS implementation; handlers depend
/// on the traits so tests can substitute mocks.
pub mod dynamo;
pub mod lambda;
pub mod logs;
pub mod s3;
pub mod sns;
