use domsrv_domain::error::DomainError;

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("domain: {0}")]
    Domain(#[from] DomainError),

    #[error("command already registered: {command}")]
    AlreadyRegistered { command: &'static str },
}
