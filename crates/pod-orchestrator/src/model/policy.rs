//! Enumerated sub-policies of a pod specification.
//!
//! Raw strings coming off the wire are resolved through a [`PolicyTable`].
//! Lookup is exact-match and never fails: anything outside the table resolves
//! to the table's default entry.

pub struct PolicyTable<T: 'static> {
    entries: &'static [(&'static str, T)],
    default: T,
}

impl<T: Copy + 'static> PolicyTable<T> {
    pub const fn new(entries: &'static [(&'static str, T)], default: T) -> Self {
        Self { entries, default }
    }

    pub fn lookup(&self, raw: &str) -> T {
        self.entries
            .iter()
            .find(|(name, _)| *name == raw)
            .map(|(_, value)| *value)
            .unwrap_or(self.default)
    }

    pub fn entries(&self) -> &'static [(&'static str, T)] {
        self.entries
    }

    pub fn default_value(&self) -> T {
        self.default
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
    Sctp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PullPolicy {
    Always,
    Never,
    IfNotPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RestartPolicy {
    Always,
    OnFailure,
    Never,
}

pub const PROTOCOLS: PolicyTable<Protocol> = PolicyTable::new(
    &[
        ("TCP", Protocol::Tcp),
        ("UDP", Protocol::Udp),
        ("SCTP", Protocol::Sctp),
    ],
    Protocol::Tcp,
);

pub const PULL_POLICIES: PolicyTable<PullPolicy> = PolicyTable::new(
    &[
        ("Always", PullPolicy::Always),
        ("Never", PullPolicy::Never),
        ("IfNotPresent", PullPolicy::IfNotPresent),
    ],
    PullPolicy::Always,
);

pub const RESTART_POLICIES: PolicyTable<RestartPolicy> = PolicyTable::new(
    &[
        ("Always", RestartPolicy::Always),
        ("OnFailure", RestartPolicy::OnFailure),
        ("Never", RestartPolicy::Never),
    ],
    RestartPolicy::Always,
);

impl Protocol {
    pub fn parse(raw: &str) -> Self {
        PROTOCOLS.lookup(raw)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::Sctp => "SCTP",
        }
    }
}

impl PullPolicy {
    pub fn parse(raw: &str) -> Self {
        PULL_POLICIES.lookup(raw)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PullPolicy::Always => "Always",
            PullPolicy::Never => "Never",
            PullPolicy::IfNotPresent => "IfNotPresent",
        }
    }
}

impl RestartPolicy {
    pub fn parse(raw: &str) -> Self {
        RESTART_POLICIES.lookup(raw)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RestartPolicy::Always => "Always",
            RestartPolicy::OnFailure => "OnFailure",
            RestartPolicy::Never => "Never",
        }
    }
}

impl Default for Protocol {
    fn default() -> Self {
        PROTOCOLS.default_value()
    }
}

impl Default for PullPolicy {
    fn default() -> Self {
        PULL_POLICIES.default_value()
    }
}

impl Default for RestartPolicy {
    fn default() -> Self {
        RESTART_POLICIES.default_value()
    }
}
