use super::quiet::QuietScope;
use crate::domain::{VibroError, VibroResult};
use crate::numerics::{BroadeningError, EigenError};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

impl From<EigenError> for VibroError {
    fn from(error: EigenError) -> Self {
        VibroError::kernel_internal(error.to_string())
    }
}

impl From<BroadeningError> for VibroError {
    fn from(error: BroadeningError) -> Self {
        VibroError::kernel_internal(error.to_string())
    }
}

/// Runs a spectrum kernel with tracing silenced and panics captured.
pub fn kernel_boundary<T>(name: &str, kernel: impl FnOnce() -> VibroResult<T>) -> VibroResult<T> {
    let outcome = {
        let _quiet = QuietScope::enter();
        panic::catch_unwind(AssertUnwindSafe(kernel))
    };
    outcome.unwrap_or_else(|payload| {
        Err(VibroError::kernel_internal(format!(
            "{name} aborted: {}",
            panic_message(payload.as_ref())
        )))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;

    #[test]
    fn passes_results_through() {
        assert_eq!(kernel_boundary("sum", || Ok(2 + 2)).ok(), Some(4));
        let error = kernel_boundary::<()>("fail", || Err(VibroError::needs_eigenvectors("no modes")))
            .expect_err("error should pass through");
        assert_eq!(error.kind(), ErrorKind::NeedsEigenvectors);
    }

    #[test]
    fn panics_become_internal_errors() {
        let error = kernel_boundary::<()>("exploding", || panic!("index out of range"))
            .expect_err("panic should be captured");
        assert_eq!(error.kind(), ErrorKind::KernelInternalError);
        assert!(error.message().contains("exploding aborted: index out of range"));
    }

    #[test]
    fn numeric_errors_map_to_internal() {
        let error: VibroError = EigenError::EmptyMatrix.into();
        assert_eq!(error.kind(), ErrorKind::KernelInternalError);
    }
}
