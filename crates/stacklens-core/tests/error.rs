//! Tests for error handling

use stacklens_core::error::{ViewError, ViewResult};
use stacklens_core::types::StackId;

#[test]
fn test_provider_error_message()
{
    let error = ViewError::Provider { stack: StackId::from(3), message: "connection reset".to_string() };
    let message = format!("{error}");
    assert!(message.contains("#3"));
    assert!(message.contains("connection reset"));
}

#[test]
fn test_frame_not_found_mentions_equality_contract()
{
    let error = ViewError::FrameNotFound { stack: StackId::from(1), frame: "main:12".to_string() };
    let message = format!("{error}");
    assert!(message.contains("main:12"));
    assert!(message.contains("same_frame"));
}

#[test]
fn test_index_out_of_range_message()
{
    let error = ViewError::IndexOutOfRange { index: 9, len: 4 };
    let message = format!("{error}");
    assert!(message.contains('9'));
    assert!(message.contains('4'));
}

#[test]
fn test_unknown_stack_message()
{
    let message = format!("{}", ViewError::UnknownStack(StackId::from(12)));
    assert!(message.contains("#12"));
}

#[test]
fn test_disposed_message()
{
    assert!(ViewError::Disposed.to_string().contains("disposed"));
}

#[test]
fn test_result_type()
{
    fn check(value: usize) -> ViewResult<usize>
    {
        if value == 0 { Err(ViewError::NotAFrame(value)) } else { Ok(value) }
    }

    assert_eq!(check(2), Ok(2));
    assert_eq!(check(0), Err(ViewError::NotAFrame(0)));
}

#[test]
fn test_error_is_std_error()
{
    fn assert_error<E: std::error::Error + Send + Sync + 'static>(_: &E) {}
    assert_error(&ViewError::Disposed);
}
