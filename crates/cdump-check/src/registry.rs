use cdump_model::CheckId;
use tracing::trace;

use crate::{
    check::{self, Check},
    error::CheckError,
};

type Constructor = fn() -> Box<dyn Check>;

struct Registration {
    code: u32,
    name: &'static str,
    build: Constructor,
}

impl Registration {
    fn answers(&self, id: &CheckId) -> bool {
        match id {
            CheckId::Code(code) => *code == self.code,
            CheckId::Name(name) => name.eq_ignore_ascii_case(self.name),
        }
    }
}

/// Lookup from a stable identifier to a check constructor.
#[derive(Default)]
pub struct CheckRegistry {
    checks: Vec<Registration>,
}

impl CheckRegistry {
    #[inline]
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    /// Registry with every built-in check.
    pub fn builtin() -> Self {
        let mut reg = Self::new();
        reg.register(0, "ImagePullBackOff", check::image_pull_back_off);
        reg.register(1, "CrashLoopBackOff", check::crash_loop_back_off);
        reg
    }

    /// Adds a check. When identifiers overlap the earliest registration wins.
    pub fn register(&mut self, code: u32, name: &'static str, build: Constructor) {
        self.checks.push(Registration { code, name, build });
    }

    pub fn contains(&self, id: &CheckId) -> bool {
        self.checks.iter().any(|r| r.answers(id))
    }

    /// Identifiers of every registered check, in registration order.
    pub fn ids(&self) -> Vec<CheckId> {
        self.checks.iter().map(|r| CheckId::Name(r.name.to_string())).collect()
    }

    /// Fails on the first unknown identifier without constructing anything.
    pub fn validate(&self, ids: &[CheckId]) -> Result<(), CheckError> {
        match ids.iter().find(|id| !self.contains(id)) {
            Some(unknown) => Err(CheckError::NoSuchCheck(unknown.clone())),
            None => Ok(()),
        }
    }

    pub fn create(&self, id: &CheckId) -> Result<Box<dyn Check>, CheckError> {
        let reg = self
            .checks
            .iter()
            .find(|r| r.answers(id))
            .ok_or_else(|| CheckError::NoSuchCheck(id.clone()))?;
        trace!(target: "cdump.check", check = reg.name, "check constructed");
        Ok((reg.build)())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_by_code_and_name() {
        let reg = CheckRegistry::builtin();
        assert_eq!(reg.create(&CheckId::Code(0)).unwrap().name(), "ImagePullBackOff");
        assert_eq!(reg.create(&"crashloopbackoff".into()).unwrap().name(), "CrashLoopBackOff");
        assert_eq!(reg.ids().len(), 2);
    }

    #[test]
    fn unknown_id_is_no_such_check() {
        let reg = CheckRegistry::builtin();
        let err = reg.create(&CheckId::Code(42)).err().unwrap();
        assert_eq!(err.to_string(), "no such check: 42");
        assert!(matches!(
            reg.validate(&[CheckId::Code(0), "Nope".into()]),
            Err(CheckError::NoSuchCheck(CheckId::Name(n))) if n == "Nope"
        ));
    }

    #[test]
    fn empty_registry_knows_nothing() {
        let reg = CheckRegistry::new();
        assert!(!reg.contains(&CheckId::Code(0)));
        assert!(reg.ids().is_empty());
    }
}
