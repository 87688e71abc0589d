use super::*;

#[test]
fn anonymous_has_no_username() {
    assert_eq!(Session::anonymous().username(), None);
}

#[test]
fn for_user_keeps_name() {
    assert_eq!(Session::for_user("dana").username(), Some("dana"));
}

#[test]
fn blank_username_is_anonymous() {
    assert_eq!(Session::for_user("   "), Session::anonymous());
}

#[test]
fn from_env_reads_user() {
    unsafe { std::env::set_var("STEPCHECK_USER", "marat") };
    assert_eq!(Session::from_env().username(), Some("marat"));
    unsafe { std::env::remove_var("STEPCHECK_USER") };
    assert_eq!(Session::from_env(), Session::anonymous());
}
