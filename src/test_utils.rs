//! Test utilities for property-based testing
//!
//! This module provides generators and helpers for proptest.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    /// Generate a valid hostname
    pub fn hostname() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9-]{0,20}[a-z0-9]?".prop_filter("Hostname must not be empty", |s| !s.is_empty())
    }

    /// Generate a single-line field value, quotes, colons and `=` included
    pub fn field_value() -> impl Strategy<Value = String> {
        "[ -~]{1,32}"
    }

    /// Generate a line terminator
    pub fn line_ending() -> impl Strategy<Value = &'static str> {
        prop_oneof![Just("\n"), Just("\r\n")]
    }

    /// Generate arbitrary line content, not necessarily UTF-8
    pub fn raw_line() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(any::<u8>(), 0..40).prop_map(|mut bytes| {
            bytes.retain(|b| *b != b'\n');
            bytes
        })
    }

    /// Generate a cloud-config line, sometimes carrying a recognized key
    pub fn user_data_line() -> impl Strategy<Value = Vec<u8>> {
        prop_oneof![
            hostname().prop_map(|h| format!("hostname: {h}").into_bytes()),
            Just(b"preserve_hostname: false".to_vec()),
            Just(b"manage_etc_hosts: true".to_vec()),
            "[a-z_]{1,12}".prop_map(|k| format!("  - name: {k}").into_bytes()),
            raw_line(),
        ]
    }

    /// Generate a `device-init.yaml` line, sometimes carrying a recognized key
    pub fn device_init_line() -> impl Strategy<Value = Vec<u8>> {
        prop_oneof![
            field_value().prop_map(|v| format!("hostname: {v}").into_bytes()),
            Just(b"wifi:".to_vec()),
            Just(b"  interfaces:".to_vec()),
            Just(b"    wlan0:".to_vec()),
            field_value().prop_map(|v| format!("      ssid: \"{v}\"").into_bytes()),
            field_value().prop_map(|v| format!("      password: {v}").into_bytes()),
            Just(b"cluster-lab:".to_vec()),
            Just(b"  run_on_boot: \"false\"".to_vec()),
            raw_line(),
        ]
    }

    /// Generate an `occidentalis.txt` line, sometimes carrying a recognized key
    pub fn occidentalis_line() -> impl Strategy<Value = Vec<u8>> {
        prop_oneof![
            field_value().prop_map(|v| format!("hostname={v}").into_bytes()),
            field_value().prop_map(|v| format!("wifi_ssid={v}").into_bytes()),
            field_value().prop_map(|v| format!("wifi_password={v}").into_bytes()),
            Just(b"# hostname for your Hypriot Raspberry Pi:".to_vec()),
            raw_line(),
        ]
    }

    /// Join generated lines into a file, with or without a final terminator
    pub fn document(line: impl Strategy<Value = Vec<u8>>) -> impl Strategy<Value = Vec<u8>> {
        (
            prop::collection::vec((line, line_ending()), 0..20),
            any::<bool>(),
        )
            .prop_map(|(lines, trailing_newline)| {
                let mut content = Vec::new();
                for (line, ending) in lines {
                    content.extend_from_slice(&line);
                    content.extend_from_slice(ending.as_bytes());
                }
                if !trailing_newline && content.last() == Some(&b'\n') {
                    content.pop();
                    if content.last() == Some(&b'\r') {
                        content.pop();
                    }
                }
                content
            })
    }

    /// Generate a whole cloud-config `user-data` file
    pub fn user_data() -> impl Strategy<Value = Vec<u8>> {
        document(user_data_line()).prop_map(|body| {
            let mut content = b"#cloud-config\n".to_vec();
            content.extend(body);
            content
        })
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use crate::config::defaults::MIN_PROPTEST_ITERATIONS;
    use crate::core::line_format::{ConfigDocument, UserData, UserDataKey};
    use crate::core::patcher::ConfigPatcher;
    use crate::core::request::ProvisioningInputs;
    use proptest::prelude::*;
    use tempfile::TempDir;

    /// Patch `file` holding `content` once in one directory and twice in
    /// another, returning both results
    fn patch_once_and_twice(
        file: &str,
        content: &[u8],
        inputs: ProvisioningInputs,
    ) -> (Vec<u8>, Vec<u8>) {
        let request = inputs.resolve().unwrap();
        let once = TempDir::new().unwrap();
        let twice = TempDir::new().unwrap();
        std::fs::write(once.path().join(file), content).unwrap();
        std::fs::write(twice.path().join(file), content).unwrap();

        ConfigPatcher::new(once.path()).apply(&request).unwrap();
        ConfigPatcher::new(twice.path()).apply(&request).unwrap();
        ConfigPatcher::new(twice.path()).apply(&request).unwrap();

        (
            std::fs::read(once.path().join(file)).unwrap(),
            std::fs::read(twice.path().join(file)).unwrap(),
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(MIN_PROPTEST_ITERATIONS))]

        #[test]
        fn unpatched_document_is_byte_identical(content in user_data()) {
            prop_assert_eq!(ConfigDocument::<UserData>::parse(&content).to_bytes(), content);
        }

        #[test]
        fn setting_hostname_only_touches_hostname_lines(
            content in user_data(),
            value in field_value(),
        ) {
            let before = ConfigDocument::<UserData>::parse(&content);
            let mut after = ConfigDocument::<UserData>::parse(&content);
            after.set(UserDataKey::Hostname, &value);

            prop_assert_eq!(before.lines().len(), after.lines().len());
            for (old, new) in before.lines().iter().zip(after.lines()) {
                prop_assert_eq!(old.ending, new.ending);
                if old.key.is_some() {
                    prop_assert_eq!(new.text.clone(), format!("hostname: {value}").into_bytes());
                } else {
                    prop_assert_eq!(&old.text, &new.text);
                }
            }
        }

        #[test]
        fn user_data_patching_twice_equals_patching_once(
            content in user_data(),
            hostname in field_value(),
        ) {
            let inputs = ProvisioningInputs {
                hostname: Some(hostname),
                ..Default::default()
            };
            let (once, twice) = patch_once_and_twice("user-data", &content, inputs);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn device_init_patching_twice_equals_patching_once(
            content in document(device_init_line()),
            hostname in proptest::option::of(field_value()),
            wifi_ssid in proptest::option::of(field_value()),
            wifi_password in proptest::option::of(field_value()),
            cluster_lab in proptest::option::of(field_value()),
        ) {
            let inputs = ProvisioningInputs {
                hostname,
                wifi_ssid,
                wifi_password,
                cluster_lab,
                ..Default::default()
            };
            let (once, twice) = patch_once_and_twice("device-init.yaml", &content, inputs);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn occidentalis_patching_twice_equals_patching_once(
            content in document(occidentalis_line()),
            hostname in proptest::option::of(field_value()),
            wifi_ssid in proptest::option::of(field_value()),
            wifi_password in proptest::option::of(field_value()),
        ) {
            let inputs = ProvisioningInputs {
                hostname,
                wifi_ssid,
                wifi_password,
                ..Default::default()
            };
            let (once, twice) = patch_once_and_twice("occidentalis.txt", &content, inputs);
            prop_assert_eq!(once, twice);
        }
    }
}
