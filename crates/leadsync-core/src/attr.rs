//! Attribute sets and records.
//!
//! Leads and companies are maps from a closed, statically known attribute
//! set to [`Field`]s. Each attribute has a camelCase storage key (used in
//! JSON and the database) and a canonical label (used in column mappings).

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::field::Field;

/// Canonical label of the shared timestamp column.
pub const LAST_UPDATED_LABEL: &str = "Last Updated";

/// A closed set of record attributes.
pub trait Attribute: Copy + Ord + fmt::Debug + Send + Sync + 'static {
    /// Every attribute, in declaration order.
    const ALL: &'static [Self];

    /// Storage key (camelCase), e.g. `linkedInUrl`.
    fn key(self) -> &'static str;

    /// Canonical mapping label, e.g. `LinkedIn UrL`.
    fn label(self) -> &'static str;

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.key() == key)
    }
}

macro_rules! attribute_set {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => $key:literal, $label:literal;)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $($variant,)+
        }

        impl Attribute for $name {
            const ALL: &'static [Self] = &[$($name::$variant,)+];

            fn key(self) -> &'static str {
                match self {
                    $($name::$variant => $key,)+
                }
            }

            fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }
    };
}

attribute_set! {
    /// Lead attributes. Identity key: `linkedInUrl`; secondary key: `email`.
    LeadAttr {
        LinkedInUrl => "linkedInUrl", "LinkedIn UrL";
        FirstName => "firstName", "First Name";
        LastName => "lastName", "Last Name";
        Email => "email", "Email";
        FirstPhone => "firstPhone", "First Phone";
        Title => "title", "Title";
        JobTitle => "jobTitle", "Job Title";
        Seniority => "seniority", "Seniority";
        Departments => "departments", "Departments";
        WorkPhone => "workPhone", "Work Phone";
        HomePhone => "homePhone", "Home Phone";
        MobilePhone => "mobilePhone", "Mobile Phone";
        OtherPhone => "otherPhone", "Other Phone";
        City => "city", "City";
        State => "state", "State";
        Country => "country", "Country";
        Facebook => "facebook", "Facebook";
        Twitter => "twitter", "Twitter";
        PastCompanies => "pastCompanies", "Past Companies";
    }
}

attribute_set! {
    /// Company attributes. Identity key: `linkedInUrl`.
    CompanyAttr {
        Name => "name", "Company Name";
        LinkedInUrl => "linkedInUrl", "Company Linkedin Url";
        Address => "address", "Address";
        Website => "website", "Company Website";
        Phone => "phone", "Phone numbers";
        Employees => "employees", "Employees";
        RetailLocation => "retailLocation", "Retail Location";
        Industry => "industry", "Industry";
        Keywords => "keywords", "Keywords";
        Facebook => "facebook", "Facebook";
        Twitter => "twitter", "Twitter";
        City => "city", "City";
        State => "state", "State";
        Country => "country", "Country";
        SeoDescription => "seoDescription", "SEO Description";
        Technologies => "technologies", "Technologies";
        AnnualRevenue => "annualRevenue", "Annual Revenue";
        TotalFunding => "totalFunding", "Total Funding";
        LatestFunding => "latestFunding", "Latest Funding";
        LatestFundingAmount => "latestFundingAmount", "Latest Funding Amount";
        LastRaisedAt => "lastRaisedAt", "Last Raised At";
    }
}

/// A record: one [`Field`] per attribute that has been observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<A: Attribute> {
    fields: BTreeMap<A, Field>,
}

pub type Lead = Record<LeadAttr>;
pub type Company = Record<CompanyAttr>;

impl<A: Attribute> Record<A> {
    pub fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    pub fn get(&self, attr: A) -> Option<&Field> {
        self.fields.get(&attr)
    }

    /// The attribute's value if present and non-empty.
    pub fn text(&self, attr: A) -> Option<&str> {
        self.fields.get(&attr).and_then(Field::text)
    }

    pub fn set(&mut self, attr: A, field: Field) {
        self.fields.insert(attr, field);
    }

    pub fn with(mut self, attr: A, field: Field) -> Self {
        self.set(attr, field);
        self
    }

    /// `(attribute, field)` pairs in attribute declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (A, &Field)> {
        self.fields.iter().map(|(a, f)| (*a, f))
    }

    /// Whether any attribute carries a non-empty value.
    pub fn has_values(&self) -> bool {
        self.fields.values().any(|f| f.text().is_some())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<A: Attribute> Default for Record<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Attribute> Serialize for Record<A> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (attr, field) in &self.fields {
            map.serialize_entry(attr.key(), field)?;
        }
        map.end()
    }
}

struct RecordVisitor<A>(PhantomData<A>);

impl<'de, A: Attribute> Visitor<'de> for RecordVisitor<A> {
    type Value = Record<A>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of attribute keys to fields")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
        let mut record = Record::new();
        while let Some(key) = access.next_key::<String>()? {
            match A::from_key(&key) {
                Some(attr) => {
                    let field: Field = access.next_value()?;
                    record.set(attr, field);
                }
                // Unknown keys (e.g. `status` on an outcome) are skipped.
                None => {
                    access.next_value::<serde::de::IgnoredAny>()?;
                }
            }
        }
        Ok(record)
    }
}

impl<'de, A: Attribute> Deserialize<'de> for Record<A> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RecordVisitor(PhantomData))
    }
}

/// A record as persisted in a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", bound = "")]
pub struct StoredRecord<A: Attribute> {
    pub id: String,
    #[serde(flatten)]
    pub record: Record<A>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
