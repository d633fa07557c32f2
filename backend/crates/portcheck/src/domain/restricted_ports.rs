//! Restricted Port Table
//!
//! Ports whose state is never disclosed to callers. Membership only changes
//! the reported label: the probe still runs and is still audited.

/// Well-known service ports and ports commonly abused for cross-protocol attacks
pub const RESTRICTED_PORTS: &[u16] = &[
    1,     // tcpmux
    7,     // echo
    9,     // discard
    11,    // systat
    13,    // daytime
    15,    // netstat
    17,    // qotd
    19,    // chargen
    20,    // ftp data
    21,    // ftp access
    22,    // ssh
    23,    // telnet
    25,    // smtp
    37,    // time
    42,    // name
    43,    // nicname
    53,    // domain
    69,    // tftp
    77,    // priv-rjs
    79,    // finger
    87,    // ttylink
    95,    // supdup
    101,   // hostname
    102,   // iso-tsap
    103,   // gppitnp
    104,   // acr-nema
    109,   // pop2
    110,   // pop3
    111,   // sunrpc
    113,   // auth
    115,   // sftp
    117,   // uucp-path
    119,   // nntp
    123,   // ntp
    135,   // epmap
    137,   // netbios
    139,   // netbios
    143,   // imap2
    161,   // snmp
    179,   // bgp
    389,   // ldap
    427,   // slp
    465,   // smtp+ssl
    512,   // exec
    513,   // login
    514,   // shell
    515,   // printer
    526,   // tempo
    530,   // courier
    531,   // chat
    532,   // netnews
    540,   // uucp
    548,   // afp
    554,   // rtsp
    556,   // remotefs
    563,   // nntp+ssl
    587,   // submission
    601,   // syslog-conn
    636,   // ldap+ssl
    989,   // ftps-data
    990,   // ftps
    993,   // imap+ssl
    995,   // pop3+ssl
    1719,  // h323gatestat
    1720,  // h323hostcall
    1723,  // pptp
    2049,  // nfs
    3659,  // apple-sasl
    4045,  // lockd
    5060,  // sip
    5061,  // sips
    6000,  // x11
    6566,  // sane-port
    6665,  // irc (alternate)
    6666,  // irc (alternate)
    6667,  // irc
    6668,  // irc (alternate)
    6669,  // irc (alternate)
    6697,  // irc+tls
    10080, // amanda
];

const WORDS: usize = (u16::MAX as usize + 1) / 64;

/// Constant-time membership set over the whole port space (8 KiB bitmap)
#[derive(Clone)]
pub struct RestrictedPortTable {
    bits: [u64; WORDS],
}

static STANDARD: RestrictedPortTable = RestrictedPortTable::from_ports(RESTRICTED_PORTS);

impl RestrictedPortTable {
    /// Build a table at compile time
    pub const fn from_ports(ports: &[u16]) -> Self {
        let mut bits = [0u64; WORDS];
        let mut i = 0;
        while i < ports.len() {
            let port = ports[i] as usize;
            bits[port / 64] |= 1u64 << (port % 64);
            i += 1;
        }
        Self { bits }
    }

    /// The compiled-in table
    pub fn standard() -> &'static Self {
        &STANDARD
    }

    #[inline]
    pub const fn contains(&self, port: u16) -> bool {
        let port = port as usize;
        self.bits[port / 64] & (1u64 << (port % 64)) != 0
    }

    pub fn len(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for RestrictedPortTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestrictedPortTable")
            .field("len", &self.len())
            .finish()
    }
}
