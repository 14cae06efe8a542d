use cadmin_derive::cadmin_error;
use std::borrow::Cow;

#[cadmin_error]
pub enum DemoError {
    #[error("Record missing{}: {message}", format_context(.context))]
    Missing { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("IO error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn read() -> Result<(), DemoError> {
    Err(std::io::Error::other("disk gone")).context("reading record")
}

fn main() {
    let err = read().unwrap_err();
    assert_eq!(err.kind(), "Io");
    assert_eq!(err.to_string(), "IO error (reading record): disk gone");

    let missing: Result<(), DemoError> =
        Err(DemoError::Missing { message: "cfg.a".into(), context: None });
    let err = missing.context("lookup").unwrap_err();
    assert_eq!(err.to_string(), "Record missing (lookup): cfg.a");

    let internal = DemoError::from("boom");
    assert_eq!(internal.kind(), "Internal");
}
