use once_cell::sync::Lazy;

/// Shared blocking HTTP client. One per process; every service call goes
/// through it. The request timeout bounds a single lock/refresh/unlock call,
/// not the polling loops built on top of them.
pub static CLIENT: Lazy<reqwest::blocking::Client> = Lazy::new(|| {
    reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .expect("failed to build blocking reqwest client")
});
