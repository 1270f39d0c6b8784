//! Typed entity records and status enums
//!
//! One struct per table and one closed enum per CHECK-constrained status
//! column. Enum `as_str`/`FromStr` round-trip the exact literals the DDL
//! checks, so a value is validated at the application boundary before it
//! ever reaches storage. The enums deliberately encode no transition
//! rules: any value in the checked set is a legal write.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declares a closed string enum mapped to the DB literal set.
macro_rules! db_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $literal:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $literal,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($literal => Ok(Self::$variant),)+
                    other => Err(format!(
                        concat!("unknown ", stringify!($name), " value: {}"),
                        other
                    )),
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

db_enum!(PersonType {
    Customer => "customer",
    Supplier => "supplier",
    Technician => "technician",
    Partner => "partner",
    Employee => "employee",
});

db_enum!(Priority {
    Normal => "normal",
    Urgent => "urgent",
    VeryUrgent => "very_urgent",
});

db_enum!(ReceptionStatus {
    Waiting => "waiting",
    InRepair => "in_repair",
    Repaired => "repaired",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

db_enum!(RepairType {
    Internal => "internal",
    Outsourced => "outsourced",
});

db_enum!(RepairStatus {
    Started => "started",
    InProgress => "in_progress",
    Done => "done",
    Stopped => "stopped",
});

db_enum!(WarrantyStatus {
    Active => "active",
    Expired => "expired",
    None => "none",
});

db_enum!(
    /// The four parallel stock ledgers.
    WarehouseType {
        NewParts => "new_parts",
        UsedParts => "used_parts",
        NewAppliances => "new_appliances",
        UsedAppliances => "used_appliances",
    }
);

db_enum!(StockStatus {
    Available => "available",
    Reserved => "reserved",
    Sold => "sold",
    Expired => "expired",
    Scrapped => "scrapped",
});

db_enum!(InventoryTxnType {
    Purchase => "purchase",
    Sale => "sale",
    RepairUse => "repair_use",
    Return => "return",
    Adjustment => "adjustment",
    Scrap => "scrap",
    Transfer => "transfer",
});

db_enum!(InvoiceType {
    Repair => "repair",
    Sale => "sale",
    Purchase => "purchase",
});

db_enum!(PaymentStatus {
    Unpaid => "unpaid",
    Partial => "partial",
    Paid => "paid",
    Cancelled => "cancelled",
});

db_enum!(ItemType {
    Part => "part",
    Service => "service",
    Device => "device",
    Labor => "labor",
});

db_enum!(AccountingTxnType {
    Income => "income",
    Expense => "expense",
    Transfer => "transfer",
});

db_enum!(CheckStatus {
    Uncollected => "uncollected",
    Collected => "collected",
    Bounced => "bounced",
    Passed => "passed",
    Blocked => "blocked",
});

db_enum!(MessageStatus {
    Pending => "pending",
    Sent => "sent",
    Failed => "failed",
});

db_enum!(UserRole {
    Admin => "admin",
    Manager => "manager",
    Operator => "operator",
});

// =============================================================================
// Entities
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: i64,
    pub person_type: PersonType,
    pub first_name: String,
    pub last_name: String,
    /// Generated column: `first_name || ' ' || last_name`.
    pub full_name: String,
    pub mobile: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub national_id: Option<String>,
    pub economic_code: Option<String>,
    pub registration_date: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: i64,
    pub device_type: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub production_year: Option<i32>,
    pub purchase_date: Option<NaiveDate>,
    pub warranty_status: WarrantyStatus,
    pub warranty_end_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reception {
    pub id: i64,
    /// Application-generated business key, `REC-YYYYMMDD-NNN`.
    pub reception_number: String,
    pub customer_id: i64,
    pub device_id: i64,
    pub reception_date: NaiveDate,
    pub reception_time: Option<String>,
    pub problem_description: Option<String>,
    pub estimated_cost: Option<f64>,
    pub priority: Priority,
    pub status: ReceptionStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repair {
    pub id: i64,
    pub reception_id: i64,
    pub repair_date: NaiveDate,
    pub technician_id: Option<i64>,
    pub repair_type: RepairType,
    pub outsourced_to: Option<i64>,
    pub outsourced_cost: f64,
    pub labor_cost: f64,
    pub parts_cost: f64,
    /// Denormalized `labor + parts + outsourced`; kept in sync by the
    /// repository, not by a DB constraint.
    pub total_cost: f64,
    /// JSON array of consumed part references.
    pub used_parts: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub status: RepairStatus,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub id: i64,
    /// Unique business key; quantities live in the warehouse tables.
    pub part_code: String,
    pub name: String,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceFee {
    pub id: i64,
    pub service_code: String,
    pub name: String,
    pub category: Option<String>,
    pub base_fee: f64,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
}

/// A stock row of one of the four warehouses. Parts warehouses reference
/// `parts.id`, appliance warehouses reference `devices.id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseItem {
    pub id: i64,
    pub warehouse: WarehouseType,
    pub item_id: i64,
    pub quantity: i64,
    pub purchase_price: f64,
    pub sale_price: f64,
    pub status: StockStatus,
    pub supplier_id: Option<i64>,
    pub batch_number: Option<String>,
    pub source_device: Option<i64>,
    pub source_customer: Option<i64>,
    pub created_at: NaiveDateTime,
}

/// Append-only stock-movement ledger row; inserted, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryTransaction {
    pub id: i64,
    pub txn_type: InventoryTxnType,
    pub warehouse: WarehouseType,
    pub item_id: i64,
    pub quantity: i64,
    pub unit_price: f64,
    pub total_price: f64,
    pub related_reception: Option<i64>,
    pub note: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: i64,
    pub invoice_number: String,
    pub invoice_type: InvoiceType,
    pub customer_id: Option<i64>,
    pub reception_id: Option<i64>,
    pub invoice_date: NaiveDate,
    pub subtotal: f64,
    pub discount: f64,
    pub tax: f64,
    pub total: f64,
    pub paid: f64,
    pub remaining: f64,
    pub payment_status: PaymentStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    pub id: i64,
    pub invoice_id: i64,
    pub item_type: ItemType,
    pub item_id: Option<i64>,
    pub description: Option<String>,
    pub quantity: i64,
    pub unit_price: f64,
    pub total_price: f64,
    /// Share of this line that feeds the partner profit split.
    pub partner_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partner {
    pub id: i64,
    pub person_id: i64,
    pub capital: f64,
    pub profit_percentage: f64,
    pub joined_date: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

/// Computed profit-distribution record; append-only derived ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerShare {
    pub id: i64,
    pub partner_id: i64,
    pub transaction_id: i64,
    pub transaction_type: AccountingTxnType,
    pub share_percentage: f64,
    pub share_amount: f64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,
    pub account_number: String,
    pub name: String,
    pub bank_name: Option<String>,
    /// Running balance, mutated together with every transaction insert.
    pub current_balance: f64,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountingTransaction {
    pub id: i64,
    pub txn_type: AccountingTxnType,
    pub from_account: Option<i64>,
    pub to_account: Option<i64>,
    pub amount: f64,
    pub txn_date: NaiveDate,
    pub description: Option<String>,
    pub related_invoice: Option<i64>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    pub id: i64,
    pub check_number: String,
    pub account_id: Option<i64>,
    pub person_id: Option<i64>,
    pub amount: f64,
    pub issue_date: Option<NaiveDate>,
    /// Drives the "due soon" dashboard query.
    pub due_date: NaiveDate,
    pub status: CheckStatus,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
}

/// SMS log row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    pub customer_id: Option<i64>,
    pub mobile: String,
    pub body: String,
    pub status: MessageStatus,
    pub sent_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

/// Generic (category, value) catalog — the only dynamically extensible
/// enumeration; everything else is CHECK-constrained.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupValue {
    pub id: i64,
    pub category: String,
    pub value: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub person_id: Option<i64>,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

/// Append-only audit trail row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: String,
    pub table_name: Option<String>,
    pub record_id: Option<i64>,
    pub created_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_literal_roundtrip() {
        assert_eq!(ReceptionStatus::InRepair.as_str(), "in_repair");
        assert_eq!(
            "in_repair".parse::<ReceptionStatus>().unwrap(),
            ReceptionStatus::InRepair
        );
        assert_eq!(Priority::VeryUrgent.as_str(), "very_urgent");
        assert_eq!(CheckStatus::Uncollected.as_str(), "uncollected");
        assert_eq!(
            "repair_use".parse::<InventoryTxnType>().unwrap(),
            InventoryTxnType::RepairUse
        );
        assert!("unknown".parse::<PersonType>().is_err());
    }

    #[test]
    fn test_enum_serde_matches_db_literals() {
        // serde snake_case must agree with as_str, both feed the same CHECKs.
        let json = serde_json::to_string(&WarehouseType::NewParts).unwrap();
        assert_eq!(json, "\"new_parts\"");
        let parsed: PaymentStatus = serde_json::from_str("\"partial\"").unwrap();
        assert_eq!(parsed, PaymentStatus::Partial);
    }
}
