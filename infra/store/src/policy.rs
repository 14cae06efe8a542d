use cadmin_domain::{Owner, Pid};

/// Decides whether `owner` may claim the unbound record `pid`.
///
/// Only consulted for unbound records; an owner re-claiming its own record is
/// always allowed and a foreign owner is always refused.
pub trait BindingPolicy: Send + Sync {
    fn permits(&self, pid: &Pid, owner: &Owner) -> bool;
}

/// Lets every owner claim every unbound record.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl BindingPolicy for AllowAll {
    fn permits(&self, _pid: &Pid, _owner: &Owner) -> bool {
        true
    }
}

impl<F> BindingPolicy for F
where
    F: Fn(&Pid, &Owner) -> bool + Send + Sync,
{
    fn permits(&self, pid: &Pid, owner: &Owner) -> bool {
        self(pid, owner)
    }
}
