//! IRC mode-string decoding.
//!
//! Channel modes are classified by the server's `CHANMODES` groups and
//! `PREFIX` table, so the same string can decode differently on different
//! networks.

use crate::isupport::NetworkInfo;

/// A single decoded mode change.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModeChange {
    /// Sign and letter, e.g. `+k`.
    pub mode: String,
    /// Consumed parameter, if the letter takes one and one was left.
    pub param: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum PlusMinus {
    Plus,
    Minus,
}

impl PlusMinus {
    fn sign(self) -> char {
        match self {
            PlusMinus::Plus => '+',
            PlusMinus::Minus => '-',
        }
    }
}

fn takes_param(info: &NetworkInfo, mode: char, adding: bool) -> bool {
    let groups = &info.chanmodes;
    if groups.a.contains(mode) || groups.b.contains(mode) || info.is_prefix_mode(mode) {
        true
    } else if groups.c.contains(mode) {
        adding
    } else {
        false
    }
}

/// Decode `modes` and its parameters into individual changes.
///
/// Parameters are consumed left to right. On non-channel targets no letter
/// takes a parameter. A letter that needs a parameter when none remain gets
/// `None`.
pub fn parse_mode_changes(
    modes: &str,
    params: &[String],
    info: &NetworkInfo,
    is_channel: bool,
) -> Vec<ModeChange> {
    use self::PlusMinus::*;

    let mut res = Vec::new();
    let mut args = params.iter();
    let mut cur_mod = Plus;

    for c in modes.chars() {
        match c {
            '+' => cur_mod = Plus,
            '-' => cur_mod = Minus,
            _ => {
                let param = if is_channel && takes_param(info, c, cur_mod == Plus) {
                    args.next().cloned()
                } else {
                    None
                };
                res.push(ModeChange {
                    mode: format!("{}{}", cur_mod.sign(), c),
                    param,
                });
            }
        }
    }

    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_key_and_flag() {
        let info = NetworkInfo::new();
        let changes = parse_mode_changes("+k-i", &strings(&["pass"]), &info, true);
        assert_eq!(
            changes,
            vec![
                ModeChange { mode: "+k".into(), param: Some("pass".into()) },
                ModeChange { mode: "-i".into(), param: None },
            ]
        );
    }

    #[test]
    fn test_limit_only_takes_param_when_adding() {
        let info = NetworkInfo::new();
        let changes = parse_mode_changes("+l-l+o", &strings(&["10", "alice"]), &info, true);
        assert_eq!(changes[0].param.as_deref(), Some("10"));
        assert_eq!(changes[1].param, None);
        assert_eq!(changes[2].param.as_deref(), Some("alice"));
    }

    #[test]
    fn test_prefix_modes_and_list_modes() {
        let info = NetworkInfo::new();
        let changes = parse_mode_changes("+ov-b", &strings(&["a", "b", "*!*@x"]), &info, true);
        let params: Vec<_> = changes.iter().map(|c| c.param.as_deref()).collect();
        assert_eq!(params, vec![Some("a"), Some("b"), Some("*!*@x")]);
    }

    #[test]
    fn test_missing_param_is_none() {
        let info = NetworkInfo::new();
        let changes = parse_mode_changes("+b", &[], &info, true);
        assert_eq!(changes, vec![ModeChange { mode: "+b".into(), param: None }]);
    }

    #[test]
    fn test_user_modes_take_no_params() {
        let info = NetworkInfo::new();
        let changes = parse_mode_changes("+iw-o", &strings(&["ignored"]), &info, false);
        assert_eq!(changes.len(), 3);
        assert!(changes.iter().all(|c| c.param.is_none()));
        assert_eq!(changes[2].mode, "-o");
    }

    #[test]
    fn test_unknown_letter_takes_no_param() {
        let info = NetworkInfo::new();
        let changes = parse_mode_changes("+Zk", &strings(&["key"]), &info, true);
        assert_eq!(changes[0].param, None);
        assert_eq!(changes[1].param.as_deref(), Some("key"));
    }
}
