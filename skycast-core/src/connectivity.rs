/// Connectivity signal as reported by a platform observer.
///
/// Observers may not have reported yet, so the signal is tri-state rather
/// than a plain bool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    Online,
    Offline,
    /// No report from the observer yet.
    #[default]
    Unknown,
}

impl Connectivity {
    /// Whether a lookup should attempt the remote fetch.
    ///
    /// `Unknown` branches like `Online`; only an explicit `Offline` report
    /// falls back to the cache.
    pub fn assume_online(self) -> bool {
        !matches!(self, Connectivity::Offline)
    }
}

impl From<Option<bool>> for Connectivity {
    fn from(reported: Option<bool>) -> Self {
        match reported {
            Some(true) => Connectivity::Online,
            Some(false) => Connectivity::Offline,
            None => Connectivity::Unknown,
        }
    }
}
