//! String-backed status columns and their typed counterparts.
//!
//! Columns are stored as short lowercase strings; these enums are the only place the
//! allowed values are spelled out.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Convert to database string representation
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }

            /// Convert from database string representation
            #[allow(clippy::should_implement_trait)]
            #[must_use]
            pub fn from_str(s: &str) -> Option<Self> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum! {
    /// Account role carried in the JWT and re-checked on every request.
    Role { User => "user", Admin => "admin" }
}

string_enum! {
    /// Package lifecycle. Only `active` packages can be bought.
    PackageStatus { Active => "active", Inactive => "inactive", Archived => "archived" }
}

string_enum! {
    /// Billing cadence of a plan.
    PlanType {
        Monthly => "monthly",
        Quarterly => "quarterly",
        HalfYearly => "half_yearly",
        Yearly => "yearly",
    }
}

impl PlanType {
    /// Like [`PlanType::from_str`] but also accepts the `6_months` spelling.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "6_months" | "half-yearly" => Some(Self::HalfYearly),
            other => Self::from_str(other),
        }
    }
}

string_enum! {
    DiscountType { Fixed => "fixed", Percentage => "percentage" }
}

string_enum! {
    PlanStatus { Active => "active", Inactive => "inactive" }
}

string_enum! {
    PurchaseStatus { Active => "active", Expired => "expired", Cancelled => "cancelled" }
}

string_enum! {
    ProjectStatus { Active => "active", Suspended => "suspended", Inactive => "inactive" }
}

string_enum! {
    PaymentStatus { Pending => "pending", Completed => "completed", Failed => "failed" }
}

string_enum! {
    TokenAction { Created => "created", Revoked => "revoked" }
}
