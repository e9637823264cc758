use crate::error::{PaymentError, Result};

pub const DEFAULT_FORM_LIMIT: usize = 10_000;

/// Intake for application forms submitted as JSON documents.
#[derive(Debug, Clone)]
pub struct ApplicationService {
    limit: usize,
}

impl ApplicationService {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn submit(&self, form: &[u8]) -> Result<&'static str> {
        if form.len() > self.limit {
            return Err(PaymentError::FormTooLarge {
                size: form.len(),
                limit: self.limit,
            });
        }
        serde_json::from_slice::<serde_json::Value>(form)
            .map_err(|e| PaymentError::ClientInput(format!("malformed form: {e}")))?;
        Ok("Application submitted successfully")
    }
}

impl Default for ApplicationService {
    fn default() -> Self {
        Self::new(DEFAULT_FORM_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_json_form() {
        let service = ApplicationService::default();
        let result = service.submit(br#"{"name":"Ada","role":"engineer"}"#);
        assert_eq!(result.unwrap(), "Application submitted successfully");
    }

    #[test]
    fn test_rejects_oversized_form() {
        let service = ApplicationService::new(16);
        let form = format!("{{\"padding\":\"{}\"}}", "x".repeat(32));
        assert!(matches!(
            service.submit(form.as_bytes()),
            Err(PaymentError::FormTooLarge { limit: 16, .. })
        ));
    }

    #[test]
    fn test_limit_is_inclusive() {
        let service = ApplicationService::new(2);
        assert!(service.submit(b"{}").is_ok());
    }

    #[test]
    fn test_rejects_malformed_form() {
        let service = ApplicationService::default();
        assert!(matches!(
            service.submit(b"name=Ada"),
            Err(PaymentError::ClientInput(_))
        ));
    }
}
