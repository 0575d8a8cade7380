use std::collections::BTreeMap;
use std::fmt;

/// Location of a PCI function.
///
/// The components are kept as text because a malformed enumerator header is recorded with
/// placeholder components instead of being dropped.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DeviceAddress {
    pub domain: String,
    pub bus: String,
    pub device: String,
    pub function: String,
}

impl DeviceAddress {
    pub const UNKNOWN_DOMAIN: &'static str = "????";
    pub const UNKNOWN_BUS: &'static str = "??";
    pub const UNKNOWN_DEVICE: &'static str = "??";
    pub const UNKNOWN_FUNCTION: &'static str = "?";

    pub fn new(
        domain: impl Into<String>,
        bus: impl Into<String>,
        device: impl Into<String>,
        function: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            bus: bus.into(),
            device: device.into(),
            function: function.into(),
        }
    }

    /// Placeholder address for a header that could not be parsed.
    pub fn unknown() -> Self {
        Self::new(
            Self::UNKNOWN_DOMAIN,
            Self::UNKNOWN_BUS,
            Self::UNKNOWN_DEVICE,
            Self::UNKNOWN_FUNCTION,
        )
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::unknown()
    }

    /// Canonical `domain:bus:device.function` key.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}.{}",
            self.domain, self.bus, self.device, self.function
        )
    }
}

/// Link state and identification of one PCI function.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceRecord {
    pub address: DeviceAddress,
    pub vendor_id: Option<String>,
    pub device_id: Option<String>,
    pub max_link_width: String,
    pub cur_link_width: String,
    pub max_link_speed: String,
    pub cur_link_speed: String,
    pub target_link_speed: String,
    pub port_number: String,
    pub revision: String,
    pub device_type: String,
}

impl DeviceRecord {
    pub const DEFAULT_WIDTH: &'static str = "0X";
    pub const DEFAULT_SPEED: &'static str = "0.0";
    pub const DEFAULT_PORT: &'static str = "00";

    /// A record with every attribute at its default.
    pub fn empty(address: DeviceAddress) -> Self {
        Self {
            address,
            vendor_id: None,
            device_id: None,
            max_link_width: Self::DEFAULT_WIDTH.to_owned(),
            cur_link_width: Self::DEFAULT_WIDTH.to_owned(),
            max_link_speed: Self::DEFAULT_SPEED.to_owned(),
            cur_link_speed: Self::DEFAULT_SPEED.to_owned(),
            target_link_speed: Self::DEFAULT_SPEED.to_owned(),
            port_number: Self::DEFAULT_PORT.to_owned(),
            revision: String::new(),
            device_type: String::new(),
        }
    }

    pub fn key(&self) -> String {
        self.address.key()
    }

    /// Value of a compared attribute. Absent IDs read as the empty string.
    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Vendor => self.vendor_id.as_deref().unwrap_or(""),
            Field::Device => self.device_id.as_deref().unwrap_or(""),
            Field::MaxWidth => &self.max_link_width,
            Field::CurWidth => &self.cur_link_width,
            Field::MaxSpeed => &self.max_link_speed,
            Field::CurSpeed => &self.cur_link_speed,
            Field::PortNumber => &self.port_number,
            Field::TargetSpeed => &self.target_link_speed,
            Field::DeviceType => &self.device_type,
            Field::Revision => &self.revision,
        }
    }
}

/// Attributes checked when comparing against a baseline.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Field {
    Vendor,
    Device,
    MaxWidth,
    CurWidth,
    MaxSpeed,
    CurSpeed,
    PortNumber,
    TargetSpeed,
    DeviceType,
    Revision,
}

impl Field {
    /// Compare order.
    pub const ALL: [Field; 10] = [
        Field::Vendor,
        Field::Device,
        Field::MaxWidth,
        Field::CurWidth,
        Field::MaxSpeed,
        Field::CurSpeed,
        Field::PortNumber,
        Field::TargetSpeed,
        Field::DeviceType,
        Field::Revision,
    ];

    /// Column name in the baseline table.
    pub fn name(self) -> &'static str {
        match self {
            Field::Vendor => "vendor",
            Field::Device => "device",
            Field::MaxWidth => "max_width",
            Field::CurWidth => "cur_width",
            Field::MaxSpeed => "max_speed",
            Field::CurSpeed => "cur_speed",
            Field::PortNumber => "pn",
            Field::TargetSpeed => "tar_speed",
            Field::DeviceType => "type",
            Field::Revision => "rev",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Records keyed by canonical address. A later record replaces an earlier one at the same key.
#[derive(Clone, Debug, Default)]
pub struct RecordSet {
    records: BTreeMap<String, DeviceRecord>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: DeviceRecord) -> Option<DeviceRecord> {
        let key = record.key();
        let replaced = self.records.insert(key, record);
        if let Some(ref old) = replaced {
            log::debug!("duplicate address {}, keeping the later record", old.key());
        }
        replaced
    }

    pub fn get(&self, key: &str) -> Option<&DeviceRecord> {
        self.records.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DeviceRecord)> {
        self.records.iter().map(|(key, record)| (key.as_str(), record))
    }
}

impl FromIterator<DeviceRecord> for RecordSet {
    fn from_iter<I: IntoIterator<Item = DeviceRecord>>(iter: I) -> Self {
        let mut set = Self::new();
        for record in iter {
            set.insert(record);
        }
        set
    }
}

impl<'a> FromIterator<&'a DeviceRecord> for RecordSet {
    fn from_iter<I: IntoIterator<Item = &'a DeviceRecord>>(iter: I) -> Self {
        iter.into_iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_at(bus: &str, device_type: &str) -> DeviceRecord {
        let mut record = DeviceRecord::empty(DeviceAddress::new("0000", bus, "00", "0"));
        record.device_type = device_type.to_owned();
        record
    }

    #[test]
    fn canonical_key() {
        let addr = DeviceAddress::new("0000", "3a", "1f", "7");
        assert_eq!(addr.key(), "0000:3a:1f.7");
        assert_eq!(DeviceAddress::unknown().key(), "????:??:??.?");
        assert!(DeviceAddress::unknown().is_unknown());
        assert!(!addr.is_unknown());
    }

    #[test]
    fn absent_ids_read_as_empty() {
        let mut record = record_at("00", "Host bridge");
        assert_eq!(record.field(Field::Vendor), "");
        assert_eq!(record.field(Field::Device), "");
        record.vendor_id = Some("8086".to_owned());
        assert_eq!(record.field(Field::Vendor), "8086");
        assert_eq!(record.field(Field::PortNumber), "00");
        assert_eq!(record.field(Field::MaxWidth), "0X");
    }

    #[test]
    fn field_names_match_baseline_columns() {
        let names: Vec<&str> = Field::ALL.iter().map(|f| f.name()).collect();
        assert_eq!(
            names,
            [
                "vendor",
                "device",
                "max_width",
                "cur_width",
                "max_speed",
                "cur_speed",
                "pn",
                "tar_speed",
                "type",
                "rev"
            ]
        );
    }

    #[test]
    fn record_set_keeps_one_record_per_address() {
        let set: RecordSet = vec![
            record_at("01", "first"),
            record_at("02", "other"),
            record_at("01", "second"),
        ]
        .into_iter()
        .collect();

        assert_eq!(set.len(), 2);
        assert_eq!(set.get("0000:01:00.0").unwrap().device_type, "second");
        assert!(set.contains("0000:02:00.0"));
        assert!(!set.contains("0000:03:00.0"));
    }

    #[test]
    fn record_set_iterates_in_address_order() {
        let set: RecordSet = vec![record_at("10", "b"), record_at("02", "a")]
            .into_iter()
            .collect();
        let keys: Vec<&str> = set.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, ["0000:02:00.0", "0000:10:00.0"]);
    }
}
