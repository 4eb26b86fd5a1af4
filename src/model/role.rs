use strum_macros::{Display, EnumString};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Role {
    Admin = 1,
    Attendant = 2,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Attendant),
            _ => None,
        }
    }

    pub fn id(&self) -> u8 {
        *self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn maps_known_role_ids() {
        assert_eq!(Role::from_id(1), Some(Role::Admin));
        assert_eq!(Role::from_id(2), Some(Role::Attendant));
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(9), None);
    }

    #[test]
    fn round_trips_role_ids() {
        for role in [Role::Admin, Role::Attendant] {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
    }

    #[test]
    fn names_are_uppercase() {
        assert_eq!(Role::Admin.to_string(), "ADMIN");
        assert_eq!(Role::from_str("ATTENDANT").unwrap(), Role::Attendant);
        assert!(Role::from_str("MANAGER").is_err());
    }
}
