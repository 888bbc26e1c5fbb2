//! Address resolution: user input → device coordinates.
//!
//! Two input forms exist for matrix ports:
//!
//! - dotted `net.node.port`, port one-based (what operators type)
//! - list selector `net-node-port`, port zero-based (what dropdowns carry)
//!
//! Every function is pure and returns `None` for anything that must not be
//! submitted to the device. Callers abort the operation on `None`.

use crate::model::{Address, Choice, GpioAddress};

/// Resolve either input form. With `from_list`, `input` is a selector
/// that must appear in `choices` (when any are known).
pub fn resolve(input: &str, from_list: bool, choices: &[Choice]) -> Option<Address> {
    if from_list {
        resolve_listed_address(input, choices)
    } else {
        resolve_address(input)
    }
}

/// Resolve a dotted, one-based `net.node.port`.
pub fn resolve_address(input: &str) -> Option<Address> {
    let [net, node, port] = components::<3>(input, '.')?;
    let port = port.checked_sub(1)?;
    Some(Address::new(net, node, port)).filter(Address::is_valid)
}

/// Resolve a `net-node-port` list selector.
///
/// With an empty `choices` list any well-formed selector is accepted;
/// otherwise the selector must be one of the offered ids.
pub fn resolve_listed_address(selector: &str, choices: &[Choice]) -> Option<Address> {
    let selector = selector.trim();
    if !choices.is_empty() && !choices.iter().any(|c| c.id == selector) {
        return None;
    }
    let [net, node, port] = components::<3>(selector, '-')?;
    Some(Address::new(net, node, port)).filter(Address::is_valid)
}

/// Resolve a dotted, one-based `node.port` GPIO line.
pub fn resolve_gpio_address(input: &str) -> Option<GpioAddress> {
    let [node, port] = components::<2>(input, '.')?;
    let port = port.checked_sub(1)?;
    Some(GpioAddress::new(node, port)).filter(GpioAddress::is_valid)
}

/// Split into exactly `N` unsigned decimal components.
fn components<const N: usize>(input: &str, sep: char) -> Option<[u32; N]> {
    let mut out = [0u32; N];
    let mut parts = input.trim().split(sep);
    for slot in &mut out {
        let part = parts.next()?;
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *slot = part.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::model::{MAX_NET, MAX_NODE, MAX_PORT};

    #[test]
    fn dotted_scenario() {
        assert_eq!(resolve_address("2.4.9"), Some(Address::new(2, 4, 8)));
        assert_eq!(resolve_address(" 1.1.1 "), Some(Address::new(1, 1, 0)));
    }

    #[test]
    fn dotted_rejects_bad_input() {
        for input in [
            "", "1.1", "1.1.1.1", "1.1.0", "a.1.1", "1..1", "1.1.-1", "+1.1.1", "1.1.1.",
            "1 .1.1", "256.1.1", "1.256.1", "1.1.1025",
        ] {
            assert_eq!(resolve_address(input), None, "accepted {input:?}");
        }
    }

    #[test]
    fn listed_requires_membership_when_choices_exist() {
        let choices = vec![Choice::new("1-2-0".to_owned(), "Mic 1")];
        assert_eq!(
            resolve_listed_address("1-2-0", &choices),
            Some(Address::new(1, 2, 0))
        );
        assert_eq!(resolve_listed_address("1-2-1", &choices), None);
        assert_eq!(resolve_listed_address("1-2-1", &[]), Some(Address::new(1, 2, 1)));
        assert_eq!(resolve_listed_address("1.2.1", &[]), None);
    }

    #[test]
    fn resolve_dispatches_on_flag() {
        assert_eq!(resolve("1-1-0", true, &[]), Some(Address::new(1, 1, 0)));
        assert_eq!(resolve("1-1-0", false, &[]), None);
        assert_eq!(resolve("1.1.1", false, &[]), Some(Address::new(1, 1, 0)));
    }

    #[test]
    fn gpio_uses_two_components() {
        assert_eq!(resolve_gpio_address("3.1"), Some(GpioAddress::new(3, 0)));
        assert_eq!(resolve_gpio_address("3.0"), None);
        assert_eq!(resolve_gpio_address("1.3.1"), None);
        assert_eq!(resolve_gpio_address("x.1"), None);
    }

    proptest! {
        #[test]
        fn valid_dotted_addresses_shift_port(
            n in 0..=MAX_NET,
            d in 0..=MAX_NODE,
            p in 1..=MAX_PORT + 1,
        ) {
            prop_assert_eq!(
                resolve_address(&format!("{n}.{d}.{p}")),
                Some(Address::new(n, d, p - 1))
            );
        }

        #[test]
        fn port_zero_is_invalid(n in 0..=MAX_NET, d in 0..=MAX_NODE) {
            prop_assert_eq!(resolve_address(&format!("{n}.{d}.0")), None);
        }

        #[test]
        fn non_numeric_component_is_invalid(
            junk in "[a-zA-Z_ ]{1,4}",
            pos in 0usize..3,
        ) {
            let mut parts = vec!["1".to_owned(), "2".to_owned(), "3".to_owned()];
            parts[pos] = junk;
            prop_assert_eq!(resolve_address(&parts.join(".")), None);
        }

        #[test]
        fn display_resolves_back(n in 0..=MAX_NET, d in 0..=MAX_NODE, p in 0..=MAX_PORT) {
            let addr = Address::new(n, d, p);
            prop_assert_eq!(resolve_address(&addr.to_string()), Some(addr));
            prop_assert_eq!(resolve_listed_address(&addr.selector(), &[]), Some(addr));
        }

        #[test]
        fn resolver_never_panics(input in ".{0,24}") {
            let _ = resolve_address(&input);
            let _ = resolve_listed_address(&input, &[]);
            let _ = resolve_gpio_address(&input);
        }
    }
}
