use cloudrt_core::{Context, OsEnv};
use cloudrt_http_send_reqwest::ReqwestHttpSend;

/// Build a [`Context`] that sends requests with a default reqwest client and
/// reads configuration from the process env.
///
/// The clock stays the system clock.
pub fn default_context() -> Context {
    Context::new()
        .with_http_send(ReqwestHttpSend::default())
        .with_env(OsEnv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_context_reads_process_env() {
        let ctx = default_context();
        assert_eq!(ctx.env_var("PATH"), std::env::var("PATH").ok());
    }
}
