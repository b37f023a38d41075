use core::any::Any;

/// Extracts the message of a panic payload produced by `panic!`.
///
/// `panic!("literal")` boxes a `&'static str`, formatted panics box a
/// `String`; anything else came from `panic_any` and has no printable form.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("<non-string panic payload>")
    }
}
