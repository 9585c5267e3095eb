use crate::packet::Verdict;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the engine trades latency for avoiding transient false denies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PolicyMode {
    #[default]
    NoDelay,
    #[serde(rename = "DelayDNSResponse")]
    DelayDnsResponse,
    DelayDeniedPacket,
}

impl PolicyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyMode::NoDelay => "NoDelay",
            PolicyMode::DelayDnsResponse => "DelayDNSResponse",
            PolicyMode::DelayDeniedPacket => "DelayDeniedPacket",
        }
    }
}

impl fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nodelay" => Ok(PolicyMode::NoDelay),
            "delaydnsresponse" => Ok(PolicyMode::DelayDnsResponse),
            "delaydeniedpacket" => Ok(PolicyMode::DelayDeniedPacket),
            other => Err(format!("unknown DNS policy mode '{}'", other)),
        }
    }
}

/// What happens to held packets that cannot be re-evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultDisposition {
    #[default]
    Accept,
    Drop,
}

impl DefaultDisposition {
    pub fn verdict(&self, mark: u32) -> Verdict {
        match self {
            DefaultDisposition::Accept => Verdict::Accept { mark },
            DefaultDisposition::Drop => Verdict::Drop,
        }
    }
}
