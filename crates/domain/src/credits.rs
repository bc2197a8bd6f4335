use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

/// Prepaid visit credits a client holds at one establishment. One credit
/// covers one appointment. `used_credits` never exceeds `total_credits`;
/// the ledger rejects over-consumption instead of clamping.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClientCredit {
    pub credit_id: String,
    pub user_id: String,
    pub establishment_id: String,
    pub total_credits: u32,
    pub used_credits: u32,
    pub expires_at: Option<PrimitiveDateTime>,
}

impl ClientCredit {
    pub fn remaining(&self) -> u32 {
        self.total_credits.saturating_sub(self.used_credits)
    }

    pub fn is_active(&self, now: PrimitiveDateTime) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at > now,
            None => true,
        }
    }
}

/// Instruction to consume credit units atomically with a chain commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreditSpend {
    pub credit_id: String,
    pub units: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn credit(total: u32, used: u32, expires_at: Option<PrimitiveDateTime>) -> ClientCredit {
        ClientCredit {
            credit_id: "credit-1".to_string(),
            user_id: "user-1".to_string(),
            establishment_id: "est-1".to_string(),
            total_credits: total,
            used_credits: used,
            expires_at,
        }
    }

    #[test]
    fn remaining_never_underflows() {
        assert_eq!(credit(5, 3, None).remaining(), 2);
        assert_eq!(credit(5, 5, None).remaining(), 0);
        assert_eq!(credit(5, 9, None).remaining(), 0);
    }

    #[test]
    fn expiry_is_exclusive() {
        let now = datetime!(2026-03-02 12:00);
        assert!(credit(5, 0, None).is_active(now));
        assert!(credit(5, 0, Some(datetime!(2026-03-02 12:01))).is_active(now));
        assert!(!credit(5, 0, Some(datetime!(2026-03-02 12:00))).is_active(now));
        assert!(!credit(5, 0, Some(datetime!(2026-03-01 12:00))).is_active(now));
    }
}
