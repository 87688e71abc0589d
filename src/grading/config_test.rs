use super::*;

/// # Safety
/// Tests touching the environment hold `ENV_LOCK` so they never race.
unsafe fn clear_grading_env() {
    unsafe {
        std::env::remove_var("STEPCHECK_BASE_URL");
        std::env::remove_var("STEPCHECK_REQUEST_TIMEOUT_SECS");
        std::env::remove_var("STEPCHECK_CONNECT_TIMEOUT_SECS");
        std::env::remove_var("STEPCHECK_TIME_BUDGET_SECS");
    }
}

static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[test]
fn from_env_defaults() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe { clear_grading_env() };

    let cfg = GradingConfig::from_env().unwrap();
    assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    assert_eq!(
        cfg.timeouts,
        GradingTimeouts { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    );
    assert_eq!(cfg.time_budget(), Some(Duration::from_secs(DEFAULT_TIME_BUDGET_SECS)));
}

#[test]
fn from_env_parses_overrides() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_grading_env();
        std::env::set_var("STEPCHECK_BASE_URL", "https://grader.example.test/api/");
        std::env::set_var("STEPCHECK_REQUEST_TIMEOUT_SECS", "5");
        std::env::set_var("STEPCHECK_CONNECT_TIMEOUT_SECS", "2");
        std::env::set_var("STEPCHECK_TIME_BUDGET_SECS", "0");
    }

    let cfg = GradingConfig::from_env().unwrap();
    assert_eq!(cfg.base_url, "https://grader.example.test/api");
    assert_eq!(cfg.timeouts, GradingTimeouts { request_secs: 5, connect_secs: 2 });
    assert_eq!(cfg.time_budget(), None);

    unsafe { clear_grading_env() };
}

#[test]
fn from_env_ignores_unparseable_numbers() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_grading_env();
        std::env::set_var("STEPCHECK_REQUEST_TIMEOUT_SECS", "soon");
    }

    let cfg = GradingConfig::from_env().unwrap();
    assert_eq!(cfg.timeouts.request_secs, DEFAULT_REQUEST_TIMEOUT_SECS);

    unsafe { clear_grading_env() };
}

#[test]
fn from_env_rejects_non_http_base_url() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_grading_env();
        std::env::set_var("STEPCHECK_BASE_URL", "ftp://grader");
    }

    let err = GradingConfig::from_env().unwrap_err().to_string();
    assert!(err.contains("base URL"));

    unsafe { clear_grading_env() };
}

#[test]
fn new_trims_trailing_slash() {
    assert_eq!(GradingConfig::new("http://localhost:5000/api/").base_url, "http://localhost:5000/api");
}

#[test]
fn with_base_url_overrides_and_validates() {
    let cfg = GradingConfig::new(DEFAULT_BASE_URL).with_base_url("https://other.test/api/").unwrap();
    assert_eq!(cfg.base_url, "https://other.test/api");
    assert!(GradingConfig::new(DEFAULT_BASE_URL).with_base_url("grader.test").is_err());
}

#[test]
fn from_env_keeps_default_budget_for_unit_suffixed_value() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_grading_env();
        std::env::set_var("STEPCHECK_TIME_BUDGET_SECS", "5m");
    }

    let cfg = GradingConfig::from_env().unwrap();
    assert_eq!(cfg.time_budget_secs, DEFAULT_TIME_BUDGET_SECS);
    assert_eq!(cfg.time_budget(), Some(Duration::from_secs(300)));

    unsafe { clear_grading_env() };
}
