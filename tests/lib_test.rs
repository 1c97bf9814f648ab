//! Library integration tests.

use vpsup::error::StepError;
use vpsup::VpsupError;

#[test]
fn error_types_are_public() {
    let err = VpsupError::PrivilegeRequired {
        operation: "vpsup run".into(),
    };
    assert!(err.to_string().contains("root"));
}

#[test]
fn step_errors_convert() {
    let err: VpsupError = StepError::Precondition("no keys".into()).into();
    assert_eq!(err.to_string(), "no keys");
}

#[test]
fn result_type_alias_is_public() {
    fn test_fn() -> vpsup::Result<()> {
        Ok(())
    }
    assert!(test_fn().is_ok());
}
