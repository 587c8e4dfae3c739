//! Line classifiers for the boot partition config formats
//!
//! The boot partition carries three text formats that get patched in place:
//! the legacy `device-init.yaml`, cloud-init `user-data` and the legacy
//! `occidentalis.txt`. None of them is parsed structurally. Each file is split
//! into lines, every line is classified by the key it carries, and only
//! lines whose key is being set are re-rendered. Everything else, including
//! line terminators and bytes that are not valid UTF-8, is written back
//! unchanged.

use std::fmt;
use std::marker::PhantomData;

/// A line-oriented config format with a fixed set of recognized keys
pub trait LineFormat {
    /// Keys this format knows how to rewrite
    type Key: Copy + Eq + fmt::Debug + 'static;

    /// File name on the boot partition
    const FILE_NAME: &'static str;

    /// Byte that ends the key part of a line (`:` or `=`)
    const SEPARATOR: u8;

    /// Recognized keys, in classification priority order
    const KEYS: &'static [Self::Key];

    /// Render a fresh line for `key` carrying `value`
    fn render(key: Self::Key, value: &str) -> String;

    /// Literal token that identifies `key` in a line
    fn token(key: Self::Key) -> &'static str;

    /// Recognize the key carried by a line, if any
    ///
    /// Only the key part is searched, so a value that happens to contain
    /// another key's token never changes how the line is classified.
    fn classify(line: &[u8]) -> Option<Self::Key> {
        let key_part = key_part(line, Self::SEPARATOR);
        Self::KEYS
            .iter()
            .copied()
            .find(|key| has_token(key_part, Self::token(*key)))
    }
}

/// Leading part of `line` up to and including the first `separator`
///
/// Empty when the line has no separator at all.
pub fn key_part(line: &[u8], separator: u8) -> &[u8] {
    line.iter()
        .position(|&b| b == separator)
        .map_or(&[][..], |idx| &line[..=idx])
}

/// Whether `key_part` contains `token` at a key boundary
///
/// A line carries a key when it contains the key's literal token. The token
/// must also not be glued to a preceding identifier character, so
/// `preserve_hostname:` does not count as a `hostname:` line and
/// `wifi_ssid:` does not count as an `ssid:` line.
pub fn has_token(key_part: &[u8], token: &str) -> bool {
    let token = token.as_bytes();
    if token.is_empty() || key_part.len() < token.len() {
        return false;
    }
    (0..=key_part.len() - token.len()).any(|idx| {
        key_part[idx..].starts_with(token)
            && idx
                .checked_sub(1)
                .map_or(true, |prev| !is_identifier_byte(key_part[prev]))
    })
}

fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || !b.is_ascii()
}

/// Quote a value for a YAML double-quoted scalar
fn yaml_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Keys of the legacy `device-init.yaml`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceInitKey {
    /// `hostname: <value>`
    Hostname,
    /// `wlan0:` block opener under `wifi.interfaces`
    Wlan0,
    /// `wifi.interfaces.wlan0.ssid`
    Ssid,
    /// `wifi.interfaces.wlan0.password`
    Password,
    /// `cluster-lab.run_on_boot`
    RunOnBoot,
}

/// Legacy `device-init.yaml`
#[derive(Debug)]
pub enum DeviceInit {}

impl LineFormat for DeviceInit {
    type Key = DeviceInitKey;

    const FILE_NAME: &'static str = "device-init.yaml";
    const SEPARATOR: u8 = b':';
    const KEYS: &'static [DeviceInitKey] = &[
        DeviceInitKey::Hostname,
        DeviceInitKey::Wlan0,
        DeviceInitKey::Ssid,
        DeviceInitKey::Password,
        DeviceInitKey::RunOnBoot,
    ];

    fn render(key: DeviceInitKey, value: &str) -> String {
        match key {
            DeviceInitKey::Hostname => format!("hostname: {value}"),
            DeviceInitKey::Wlan0 => "  wlan0:".to_string(),
            DeviceInitKey::Ssid => format!("      ssid: {}", yaml_quote(value)),
            DeviceInitKey::Password => format!("      password: {}", yaml_quote(value)),
            DeviceInitKey::RunOnBoot => format!("  run_on_boot: {}", yaml_quote(value)),
        }
    }

    fn token(key: DeviceInitKey) -> &'static str {
        match key {
            DeviceInitKey::Hostname => "hostname:",
            DeviceInitKey::Wlan0 => "wlan0:",
            DeviceInitKey::Ssid => "ssid:",
            DeviceInitKey::Password => "password:",
            DeviceInitKey::RunOnBoot => "run_on_boot",
        }
    }
}

/// Keys of cloud-init `user-data`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserDataKey {
    /// `hostname: <value>`
    Hostname,
}

/// cloud-init `user-data`
#[derive(Debug)]
pub enum UserData {}

impl LineFormat for UserData {
    type Key = UserDataKey;

    const FILE_NAME: &'static str = "user-data";
    const SEPARATOR: u8 = b':';
    const KEYS: &'static [UserDataKey] = &[UserDataKey::Hostname];

    fn render(key: UserDataKey, value: &str) -> String {
        match key {
            UserDataKey::Hostname => format!("hostname: {value}"),
        }
    }

    fn token(key: UserDataKey) -> &'static str {
        match key {
            UserDataKey::Hostname => "hostname:",
        }
    }
}

/// Keys of the legacy `occidentalis.txt`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccidentalisKey {
    /// `hostname=<value>`
    Hostname,
    /// `wifi_ssid=<value>`
    WifiSsid,
    /// `wifi_password=<value>`
    WifiPassword,
}

/// Legacy `occidentalis.txt`
#[derive(Debug)]
pub enum Occidentalis {}

impl LineFormat for Occidentalis {
    type Key = OccidentalisKey;

    const FILE_NAME: &'static str = "occidentalis.txt";
    const SEPARATOR: u8 = b'=';
    const KEYS: &'static [OccidentalisKey] = &[
        OccidentalisKey::Hostname,
        OccidentalisKey::WifiSsid,
        OccidentalisKey::WifiPassword,
    ];

    fn render(key: OccidentalisKey, value: &str) -> String {
        format!("{}{value}", Self::token(key))
    }

    fn token(key: OccidentalisKey) -> &'static str {
        match key {
            OccidentalisKey::Hostname => "hostname=",
            OccidentalisKey::WifiSsid => "wifi_ssid=",
            OccidentalisKey::WifiPassword => "wifi_password=",
        }
    }
}

/// One line of a config document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line<K> {
    /// Line content without its terminator
    pub text: Vec<u8>,
    /// Terminator as found in the file (`"\n"`, `"\r\n"` or empty)
    pub ending: &'static str,
    /// Key recognized in `text`
    pub key: Option<K>,
}

/// A config file as an ordered sequence of classified lines
#[derive(Debug)]
pub struct ConfigDocument<F: LineFormat> {
    lines: Vec<Line<F::Key>>,
    _format: PhantomData<F>,
}

impl<F: LineFormat> ConfigDocument<F> {
    /// Split `content` into classified lines
    pub fn parse(content: &[u8]) -> Self {
        let lines = content
            .split_inclusive(|&b| b == b'\n')
            .map(|chunk| {
                let (text, ending) = if let Some(text) = chunk.strip_suffix(b"\r\n") {
                    (text, "\r\n")
                } else if let Some(text) = chunk.strip_suffix(b"\n") {
                    (text, "\n")
                } else {
                    (chunk, "")
                };
                Line {
                    text: text.to_vec(),
                    ending,
                    key: F::classify(text),
                }
            })
            .collect();

        Self {
            lines,
            _format: PhantomData,
        }
    }

    /// Classified lines in file order
    pub fn lines(&self) -> &[Line<F::Key>] {
        &self.lines
    }

    /// Rewrite every line carrying `key`, returning how many matched
    pub fn set(&mut self, key: F::Key, value: &str) -> usize {
        let rendered = F::render(key, value).into_bytes();
        let mut matched = 0;
        for line in self.lines.iter_mut().filter(|line| line.key == Some(key)) {
            line.text.clone_from(&rendered);
            matched += 1;
        }
        matched
    }

    /// Serialize back to file content
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for line in &self.lines {
            out.extend_from_slice(&line.text);
            out.extend_from_slice(line.ending.as_bytes());
        }
        out
    }
}
