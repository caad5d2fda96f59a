use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign};

/// 클래스 권한 비트마스크 (SELECT/INSERT/UPDATE/DELETE)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Privilege(u8);

impl Privilege {
    pub const NONE: Privilege = Privilege(0);
    pub const SELECT: Privilege = Privilege(1);
    pub const INSERT: Privilege = Privilege(1 << 1);
    pub const UPDATE: Privilege = Privilege(1 << 2);
    pub const DELETE: Privilege = Privilege(1 << 3);
    pub const ALL: Privilege = Privilege(0b1111);

    /// ON DUPLICATE KEY UPDATE
    pub const INSERT_UPDATE: Privilege = Privilege(0b0110);
    /// REPLACE
    pub const REPLACE: Privilege = Privilege(0b1010);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Privilege) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// 권한 이름 목록 (오류 메시지용)
    pub fn names(self) -> Vec<&'static str> {
        let mut names = Vec::new();
        for (flag, name) in [
            (Privilege::SELECT, "SELECT"),
            (Privilege::INSERT, "INSERT"),
            (Privilege::UPDATE, "UPDATE"),
            (Privilege::DELETE, "DELETE"),
        ] {
            if self.contains(flag) {
                names.push(name);
            }
        }
        names
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        f.write_str(&self.names().join("|"))
    }
}

impl BitAnd for Privilege {
    type Output = Privilege;
    fn bitand(self, rhs: Self) -> Self::Output {
        Privilege(self.0 & rhs.0)
    }
}

impl BitAndAssign for Privilege {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl BitOr for Privilege {
    type Output = Privilege;
    fn bitor(self, rhs: Self) -> Self::Output {
        Privilege(self.0 | rhs.0)
    }
}

impl BitOrAssign for Privilege {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privilege_combinations() {
        let p = Privilege::SELECT | Privilege::UPDATE;
        assert!(p.contains(Privilege::SELECT));
        assert!(!p.contains(Privilege::INSERT_UPDATE));
        assert_eq!((p & Privilege::ALL), p);
        assert_eq!(Privilege::INSERT_UPDATE, Privilege::INSERT | Privilege::UPDATE);
        assert_eq!(Privilege::REPLACE, Privilege::INSERT | Privilege::DELETE);
    }

    #[test]
    fn test_privilege_display() {
        assert_eq!(Privilege::ALL.to_string(), "SELECT|INSERT|UPDATE|DELETE");
        assert_eq!(Privilege::NONE.to_string(), "NONE");
        assert_eq!(Privilege::UPDATE.to_string(), "UPDATE");
    }
}
