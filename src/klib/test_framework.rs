//! Framework de testes do kernel
//!
//! Suites de self-test rodam dentro do kernel (feature `self_test`) e também
//! sob `cargo test`, onde o resultado é verificado com `assert_eq!`.

/// Resultado de teste
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestResult {
    Passed,
    Failed,
    Skipped,
}

/// Um caso de teste
pub struct TestCase {
    pub name: &'static str,
    pub func: fn() -> TestResult,
}

impl TestCase {
    pub const fn new(name: &'static str, func: fn() -> TestResult) -> Self {
        Self { name, func }
    }
}

/// Contagem final de uma suite
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuiteReport {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl SuiteReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Executa suite de testes
pub fn run_test_suite(name: &str, tests: &[TestCase]) -> SuiteReport {
    crate::kinfo!("=== Executando suite:");
    crate::kinfo!(name);

    let mut report = SuiteReport::default();

    for test in tests {
        match (test.func)() {
            TestResult::Passed => {
                crate::kok!(test.name);
                report.passed += 1;
            }
            TestResult::Failed => {
                crate::kfail!(test.name);
                report.failed += 1;
            }
            TestResult::Skipped => {
                crate::kwarn!(test.name);
                report.skipped += 1;
            }
        }
    }

    crate::kinfo!("Resultados: passed=", report.passed);
    if report.failed > 0 {
        crate::kerror!("Resultados: failed=", report.failed);
    }
    report
}

/// Converte uma condição em `TestResult`, registrando a falha.
#[inline]
pub fn check(cond: bool, what: &'static str) -> TestResult {
    if cond {
        TestResult::Passed
    } else {
        crate::kerror!(what);
        TestResult::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok() -> TestResult {
        TestResult::Passed
    }

    fn bad() -> TestResult {
        TestResult::Failed
    }

    fn skip() -> TestResult {
        TestResult::Skipped
    }

    #[test]
    fn suite_counts_every_outcome() {
        let cases = [
            TestCase::new("ok", ok),
            TestCase::new("bad", bad),
            TestCase::new("skip", skip),
            TestCase::new("ok2", ok),
        ];
        let report = run_test_suite("framework", &cases);
        assert_eq!(
            report,
            SuiteReport {
                passed: 2,
                failed: 1,
                skipped: 1
            }
        );
        assert!(!report.is_success());
    }
}
