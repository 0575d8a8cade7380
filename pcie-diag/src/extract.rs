//! Extraction rules over a single device block.
//!
//! Every rule is total: when its pattern does not match it returns the documented default
//! instead of failing, so a partially readable block still yields a record.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::block::Block;
use crate::record::{DeviceAddress, DeviceRecord};

static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9a-fA-F]{4}):([0-9a-fA-F]{2}):([0-9a-fA-F]{2})\.([0-7])\s+(.*)$")
        .expect("header pattern")
});
static IDS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([0-9a-fA-F]{4}):([0-9a-fA-F]{4})\]").expect("id pattern"));
static WIDTH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Width x(\d+)").expect("width pattern"));
static SPEED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Speed (\d+(?:\.\d+)?)GT/s").expect("speed pattern"));
static TARGET_SPEED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Target Link Speed:\s+(\d+(?:\.\d+)?)GT/s").expect("target speed pattern")
});
static PORT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Port\s+#(\d+)").expect("port pattern"));
static REVISION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\(rev\s+([0-9a-f]{2})\)").expect("revision pattern"));

const LNK_CAP: &str = "LnkCap:";
const LNK_STA: &str = "LnkSta:";
const LNK_CTL2: &str = "LnkCtl2:";

/// Splits a header into its address and the description that follows it.
pub fn parse_address(header: &str) -> (DeviceAddress, &str) {
    match HEADER_RE.captures(header) {
        Some(caps) => {
            let addr = DeviceAddress::new(
                caps[1].to_ascii_lowercase(),
                caps[2].to_ascii_lowercase(),
                caps[3].to_ascii_lowercase(),
                &caps[4],
            );
            let description = caps.get(5).map_or("", |m| m.as_str());
            (addr, description)
        }
        None => {
            log::debug!("extract: malformed header {:?}", header);
            (DeviceAddress::unknown(), header)
        }
    }
}

/// First bracketed `[vendor:device]` pair in the description.
pub fn parse_ids(description: &str) -> Option<(String, String)> {
    let caps = IDS_RE.captures(description)?;
    Some((caps[1].to_ascii_lowercase(), caps[2].to_ascii_lowercase()))
}

/// Device class name used in reports and baselines.
pub fn classify(description: &str) -> String {
    const KNOWN: [(&str, &str); 4] = [
        ("pci bridge", "PCI/PCI Bridge"),
        ("usb controller", "USB 3.0"),
        ("sata controller", "SATA controller"),
        ("ethernet controller", "Ethernet controller"),
    ];

    let lower = description.to_lowercase();
    KNOWN
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, name)| (*name).to_owned())
        .unwrap_or_else(|| description.split(':').next().unwrap_or("").to_owned())
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinkInfo {
    pub max_width: String,
    pub cur_width: String,
    pub max_speed: String,
    pub cur_speed: String,
    pub target_speed: String,
}

fn width(line: &str) -> Option<String> {
    WIDTH_RE.captures(line).map(|caps| format!("{}X", &caps[1]))
}

fn capture(re: &Regex, line: &str) -> Option<String> {
    re.captures(line).map(|caps| caps[1].to_owned())
}

/// Link capability, status and target speed from the detail lines.
pub fn parse_link<S: AsRef<str>>(details: &[S]) -> LinkInfo {
    let mut max_width = None;
    let mut cur_width = None;
    let mut max_speed = None;
    let mut cur_speed = None;
    let mut target_speed = None;

    for line in details {
        let line = line.as_ref().trim();

        if line.starts_with(LNK_CAP) {
            max_width = width(line).or(max_width);
            max_speed = capture(&SPEED_RE, line).or(max_speed);
        } else if line.starts_with(LNK_STA) {
            cur_width = width(line).or(cur_width);
            cur_speed = capture(&SPEED_RE, line).or(cur_speed);
        } else if line.starts_with(LNK_CTL2) {
            target_speed = capture(&TARGET_SPEED_RE, line).or(target_speed);
        }
    }

    let cur_speed = cur_speed.unwrap_or_else(|| DeviceRecord::DEFAULT_SPEED.to_owned());
    // An unconfigured target means the link stays where it trained.
    let target_speed = target_speed.unwrap_or_else(|| cur_speed.clone());

    LinkInfo {
        max_width: max_width.unwrap_or_else(|| DeviceRecord::DEFAULT_WIDTH.to_owned()),
        cur_width: cur_width.unwrap_or_else(|| DeviceRecord::DEFAULT_WIDTH.to_owned()),
        max_speed: max_speed.unwrap_or_else(|| DeviceRecord::DEFAULT_SPEED.to_owned()),
        cur_speed,
        target_speed,
    }
}

/// Port number from the first link capability line that carries one, zero-padded to 2 digits.
pub fn parse_port<S: AsRef<str>>(details: &[S]) -> String {
    details
        .iter()
        .map(|line| line.as_ref().trim())
        .filter(|line| line.starts_with(LNK_CAP))
        .find_map(|line| capture(&PORT_RE, line))
        .map(|port| format!("{:0>2}", port))
        .unwrap_or_else(|| DeviceRecord::DEFAULT_PORT.to_owned())
}

/// Revision from a `(rev XX)` annotation on the header, lowercased.
pub fn parse_revision(header: &str) -> String {
    REVISION_RE
        .captures(header)
        .map(|caps| caps[1].to_ascii_lowercase())
        .unwrap_or_default()
}

impl DeviceRecord {
    pub fn from_block(block: &Block<'_>) -> Self {
        let (address, description) = parse_address(block.header);
        let (vendor_id, device_id) = match parse_ids(description) {
            Some((vendor, device)) => (Some(vendor), Some(device)),
            None => (None, None),
        };
        let link = parse_link(&block.details);

        let record = Self {
            address,
            vendor_id,
            device_id,
            max_link_width: link.max_width,
            cur_link_width: link.cur_width,
            max_link_speed: link.max_speed,
            cur_link_speed: link.cur_speed,
            target_link_speed: link.target_speed,
            port_number: parse_port(&block.details),
            revision: parse_revision(block.header),
            device_type: classify(description),
        };
        log::trace!("extract: {:?}", record);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::split_blocks;

    const ROOT_PORT: &str = "\
0000:00:1c.0 PCI bridge [0604]: Intel Corporation Cannon Lake PCH PCI Express Root Port #5 [8086:a33c] (rev F0) (prog-if 00 [Normal decode])
\tCapabilities: [40] Express (v2) Root Port (Slot+), MSI 00
\t\tLnkCap:\tPort #5, Speed 8GT/s, Width x4, ASPM L0s L1, Exit Latency L0s <1us, L1 <16us
\t\tLnkCtl:\tASPM Disabled; RCB 64 bytes, Disabled- CommClk+
\t\tLnkSta:\tSpeed 2.5GT/s (downgraded), Width x1 (downgraded)
\t\tLnkCap2: Supported Link Speeds: 2.5-8GT/s, Crosslink- Retimer- 2Retimers- DRS-
\t\tLnkCtl2: Target Link Speed: 8GT/s, EnterCompliance- SpeedDis-
";

    #[test]
    fn address_and_description() {
        let (addr, desc) = parse_address("0000:3B:00.1 Ethernet controller [0200]: Foo [8086:1572]");
        assert_eq!(addr, DeviceAddress::new("0000", "3b", "00", "1"));
        assert_eq!(desc, "Ethernet controller [0200]: Foo [8086:1572]");
    }

    #[test]
    fn malformed_header_keeps_text() {
        for header in ["00:1f.3 Audio device", "0000:00:00.8 Bad function", "garbage"] {
            let (addr, desc) = parse_address(header);
            assert!(addr.is_unknown(), "{}", header);
            assert_eq!(desc, header);
        }
    }

    #[test]
    fn ids_are_lowercased_and_stable() {
        let desc = "VGA compatible controller [0300]: NVIDIA Corporation GA102 [10DE:2204] (rev a1)";
        let first = parse_ids(desc);
        assert_eq!(first, Some(("10de".to_owned(), "2204".to_owned())));
        assert_eq!(parse_ids(desc), first);
        assert_eq!(parse_ids("Host bridge [0600]: Unknown"), None);
    }

    #[test]
    fn classification_priority() {
        assert_eq!(classify("PCI bridge [0604]: Intel"), "PCI/PCI Bridge");
        assert_eq!(classify("USB controller [0c03]: Intel xHCI"), "USB 3.0");
        assert_eq!(classify("SATA controller [0106]: AHCI"), "SATA controller");
        assert_eq!(classify("Ethernet controller [0200]: Intel"), "Ethernet controller");
        assert_eq!(
            classify("Non-Volatile memory controller [0108]: Samsung"),
            "Non-Volatile memory controller [0108]"
        );
        assert_eq!(classify("no colon here"), "no colon here");
    }

    #[test]
    fn root_port_link_state() {
        let block = split_blocks(ROOT_PORT).next().unwrap();
        let record = DeviceRecord::from_block(&block);

        assert_eq!(record.key(), "0000:00:1c.0");
        assert_eq!(record.vendor_id.as_deref(), Some("8086"));
        assert_eq!(record.device_id.as_deref(), Some("a33c"));
        assert_eq!(record.max_link_width, "4X");
        assert_eq!(record.cur_link_width, "1X");
        assert_eq!(record.max_link_speed, "8");
        assert_eq!(record.cur_link_speed, "2.5");
        assert_eq!(record.target_link_speed, "8");
        assert_eq!(record.port_number, "05");
        assert_eq!(record.revision, "f0");
        assert_eq!(record.device_type, "PCI/PCI Bridge");
    }

    #[test]
    fn target_speed_falls_back_to_current() {
        let link = parse_link(&["\tLnkSta:\tSpeed 5.0GT/s, Width x8"]);
        assert_eq!(link.cur_speed, "5.0");
        assert_eq!(link.target_speed, "5.0");
        assert_eq!(link.cur_width, "8X");
    }

    #[test]
    fn link_defaults() {
        let link = parse_link::<&str>(&[]);
        assert_eq!(link.max_width, "0X");
        assert_eq!(link.cur_width, "0X");
        assert_eq!(link.max_speed, "0.0");
        assert_eq!(link.cur_speed, "0.0");
        assert_eq!(link.target_speed, "0.0");
    }

    #[test]
    fn port_defaults_to_zero() {
        assert_eq!(parse_port(&["\tLnkSta:\tSpeed 5GT/s"]), "00");
        // Only capability lines carry the port number.
        assert_eq!(parse_port(&["\tSlot: Port #7"]), "00");
        assert_eq!(parse_port(&["\tLnkCap:\tPort #12, Speed 16GT/s"]), "12");
    }

    #[test]
    fn revision_annotation() {
        assert_eq!(parse_revision("0000:00:00.0 Host bridge [0600]: x (REV 0D)"), "0d");
        assert_eq!(parse_revision("0000:00:00.0 Host bridge [0600]: x"), "");
    }

    #[test]
    fn malformed_block_still_yields_record() {
        let block = split_blocks("not a pci header\n\tLnkSta: Speed ?, Width ?\n")
            .next()
            .unwrap();
        let record = DeviceRecord::from_block(&block);
        assert!(record.address.is_unknown());
        assert_eq!(record.device_type, "not a pci header");
        assert_eq!(record.vendor_id, None);
        assert_eq!(record.cur_link_width, "0X");
        assert_eq!(record.port_number, "00");
    }
}
