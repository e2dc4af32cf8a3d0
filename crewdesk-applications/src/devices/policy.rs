//! Field-level edit policy for devices

use crate::auth::{is_authorized, AllowSet, Role};
use std::fmt;

/// Editable device fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceField {
    Amount,
    Brand,
    BuyDate,
    Category,
    Comments,
    Container,
    Description,
    Location,
    LocationPrec,
    Price,
    Status,
    Store,
}

impl DeviceField {
    pub fn name(self) -> &'static str {
        match self {
            DeviceField::Amount => "amount",
            DeviceField::Brand => "brand",
            DeviceField::BuyDate => "buyDate",
            DeviceField::Category => "category",
            DeviceField::Comments => "comments",
            DeviceField::Container => "container",
            DeviceField::Description => "description",
            DeviceField::Location => "location",
            DeviceField::LocationPrec => "location_prec",
            DeviceField::Price => "price",
            DeviceField::Status => "status",
            DeviceField::Store => "store",
        }
    }

    /// Roles allowed to change this field. Day-to-day fields (where a device
    /// is, whether it is out) are open to every crew member; inventory data is
    /// reserved for moderators and admins.
    pub fn allowed(self) -> AllowSet {
        match self {
            DeviceField::Status
            | DeviceField::Location
            | DeviceField::LocationPrec
            | DeviceField::Container
            | DeviceField::Comments => AllowSet::staff(),
            _ => AllowSet::editors(),
        }
    }
}

impl fmt::Display for DeviceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns the first changed field `role` may not touch
pub fn forbidden_field(role: Role, changed: &[DeviceField]) -> Option<DeviceField> {
    changed
        .iter()
        .copied()
        .find(|field| !is_authorized(role, &field.allowed()))
}

/// Fields accepted by the bulk edit endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BulkField {
    Location,
    LocationPrec,
    Container,
}

impl BulkField {
    pub fn column(self) -> &'static str {
        match self {
            BulkField::Location => "location",
            BulkField::LocationPrec => "location_prec",
            BulkField::Container => "container",
        }
    }
}

impl std::str::FromStr for BulkField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "location" => Ok(BulkField::Location),
            "location_prec" => Ok(BulkField::LocationPrec),
            "container" => Ok(BulkField::Container),
            _ => Err(format!("Field cannot be bulk edited: {}", s)),
        }
    }
}
