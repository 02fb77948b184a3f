//! Force Resolution Engine
//!
//! Pure, deterministic mapping from the current elapsed time and a directive
//! to the elapsed time the display should jump to. `None` means the directive
//! does not apply right now; it is never an error to the spectator.

use serde::{Deserialize, Serialize};
use tempra_core::{
    split_sscc, ElapsedMs, ForceDirective, Mode, Target, TempraError, TempraResult,
};

/// Sum of the decimal digits of `n`
///
/// Zero padding never changes a digit sum, so `07` and `7` agree.
#[inline]
pub fn digit_sum(mut n: u64) -> u64 {
    let mut sum = 0;
    while n > 0 {
        sum += n % 10;
        n /= 10;
    }
    sum
}

/// Digit sum of the displayed `MM:SS,CC`
#[inline]
pub fn display_digit_sum(elapsed: ElapsedMs) -> u64 {
    let (mm, ss, cs) = elapsed.parts();
    digit_sum(mm) + digit_sum(ss) + digit_sum(cs)
}

/// How far the `s` force may look for a matching time
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum DigitSumSearch {
    /// Only centiseconds of the current second
    #[default]
    SameSecond,
    /// The current second and up to `max_seconds` after it, never earlier
    /// than the current time
    Forward { max_seconds: u64 },
}

/// Force resolver with a configured digit-sum search
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Resolver {
    search: DigitSumSearch,
}

impl Resolver {
    pub fn new(search: DigitSumSearch) -> Self {
        Resolver { search }
    }

    pub fn search(&self) -> DigitSumSearch {
        self.search
    }

    /// Resolve `directive` against `elapsed`
    ///
    /// `control` and `preset` never resolve to a time. A `list` resolves its
    /// first sub-directive and does not pop it; popping belongs to the gate.
    pub fn resolve(&self, elapsed: ElapsedMs, directive: &ForceDirective) -> Option<ElapsedMs> {
        match directive.mode {
            Mode::Ms => resolve_ms(elapsed, directive.target.as_ref()?.as_integer()?),
            Mode::Ft => resolve_ft(&directive.target.as_ref()?.as_text()),
            Mode::S => {
                let target = directive.target.as_ref()?.as_integer()?;
                let target = u64::try_from(target).ok()?;
                match self.search {
                    DigitSumSearch::SameSecond => resolve_digit_sum(elapsed, target),
                    DigitSumSearch::Forward { max_seconds } => {
                        resolve_digit_sum_forward(elapsed, target, max_seconds)
                    }
                }
            }
            Mode::List => {
                let head = directive.list.first()?;
                if !head.mode.is_list_item() {
                    return None;
                }
                self.resolve(elapsed, head)
            }
            Mode::Control | Mode::Preset => None,
        }
    }

    /// Like [`Resolver::resolve`], with a failure reported as `UnresolvableForce`
    pub fn resolve_strict(
        &self,
        elapsed: ElapsedMs,
        directive: &ForceDirective,
    ) -> TempraResult<ElapsedMs> {
        self.resolve(elapsed, directive)
            .ok_or(TempraError::UnresolvableForce {
                mode: directive.mode,
            })
    }
}

/// Resolve with the default (same-second) search
pub fn resolve(elapsed: ElapsedMs, directive: &ForceDirective) -> Option<ElapsedMs> {
    Resolver::default().resolve(elapsed, directive)
}

/// `ms`: keep minutes and seconds, set centiseconds
pub fn resolve_ms(elapsed: ElapsedMs, target: i64) -> Option<ElapsedMs> {
    if !(0..=99).contains(&target) {
        return None;
    }
    let (mm, ss, _) = elapsed.parts();
    Some(ElapsedMs::from_parts(mm, ss, target as u64))
}

/// `ft`: `SSCC` sets seconds and centiseconds; minutes become zero
pub fn resolve_ft(target: &str) -> Option<ElapsedMs> {
    let (ss, cs) = split_sscc(target)?;
    if ss >= 60 || cs >= 100 {
        return None;
    }
    Some(ElapsedMs::from_parts(0, ss, cs))
}

/// `s`: first centisecond of the current second whose display digit sum is `target`
pub fn resolve_digit_sum(elapsed: ElapsedMs, target: u64) -> Option<ElapsedMs> {
    let (mm, ss, _) = elapsed.parts();
    first_matching_centi(mm, ss, 0, target)
}

/// `s` with forward search over the next `max_seconds` seconds
///
/// Candidates in the current second start at the current centisecond (or the
/// next one if the clock is part-way through it), so the result is never
/// earlier than `elapsed`.
pub fn resolve_digit_sum_forward(
    elapsed: ElapsedMs,
    target: u64,
    max_seconds: u64,
) -> Option<ElapsedMs> {
    let whole = elapsed.whole_seconds();
    let (_, _, cs) = elapsed.parts();
    let partial = elapsed.as_millis() % 10 != 0;
    let first_cs = if partial { cs + 1 } else { cs };

    (0..=max_seconds).find_map(|offset| {
        let total = whole + offset;
        let (mm, ss) = (total / 60, total % 60);
        let from = if offset == 0 { first_cs } else { 0 };
        first_matching_centi(mm, ss, from, target)
    })
}

fn first_matching_centi(mm: u64, ss: u64, from: u64, target: u64) -> Option<ElapsedMs> {
    let fixed = digit_sum(mm) + digit_sum(ss);
    if fixed > target {
        return None;
    }
    (from..=99)
        .find(|cs| fixed + digit_sum(*cs) == target)
        .map(|cs| ElapsedMs::from_parts(mm, ss, cs))
}

/// Preview a directive without a timer, as the performer would
pub fn preview(elapsed: ElapsedMs, directive: &ForceDirective, resolver: &Resolver) -> String {
    match resolver.resolve(elapsed, directive) {
        Some(forced) => format!("{} -> {}", elapsed, forced),
        None => match &directive.target {
            Some(Target::Number(n)) => {
                format!("{} -> unresolvable ({} {})", elapsed, directive.mode, n)
            }
            Some(Target::Text(t)) => {
                format!("{} -> unresolvable ({} {:?})", elapsed, directive.mode, t)
            }
            None => format!("{} -> unresolvable ({})", elapsed, directive.mode),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempra_core::ControlAction;

    #[test]
    fn test_digit_sum() {
        assert_eq!(digit_sum(0), 0);
        assert_eq!(digit_sum(7), 7);
        assert_eq!(digit_sum(59), 14);
        assert_eq!(digit_sum(1_234), 10);
    }

    #[test]
    fn test_ms_keeps_minutes_and_seconds() {
        let e = ElapsedMs::from_parts(2, 34, 87);
        assert_eq!(resolve(e, &ForceDirective::ms(15)), Some(ElapsedMs::from_parts(2, 34, 15)));
        assert_eq!(resolve(e, &ForceDirective::ms(100)), None);
        assert_eq!(resolve(e, &ForceDirective::ms(-1)), None);
    }

    #[test]
    fn test_ms_accepts_numeric_text() {
        let mut d = ForceDirective::ms(0);
        d.target = Some(Target::Text("42".into()));
        assert_eq!(
            resolve(ElapsedMs::from_parts(0, 3, 0), &d),
            Some(ElapsedMs::from_parts(0, 3, 42))
        );
    }

    #[test]
    fn test_ft_zeroes_minutes() {
        let e = ElapsedMs::from_parts(5, 10, 10);
        assert_eq!(resolve(e, &ForceDirective::ft("2443")), Some(ElapsedMs::from_parts(0, 24, 43)));
        assert_eq!(resolve(e, &ForceDirective::ft("6000")), None);
        assert_eq!(resolve(e, &ForceDirective::ft("12a4")), None);
        assert_eq!(resolve(e, &ForceDirective::ft("123")), None);
    }

    #[test]
    fn test_digit_sum_same_second() {
        // 00:12 has fixed sum 3; first cs with digit sum 7 is 07
        let e = ElapsedMs::from_parts(0, 12, 90);
        assert_eq!(
            resolve(e, &ForceDirective::digit_sum(10)),
            Some(ElapsedMs::from_parts(0, 12, 7))
        );
        // max reachable is 3 + 18
        assert_eq!(resolve(e, &ForceDirective::digit_sum(50)), None);
        assert_eq!(resolve(e, &ForceDirective::digit_sum(2)), None);
    }

    #[test]
    fn test_digit_sum_forward_carries_into_minutes() {
        // 00:59 has fixed sum 14; 01:00 has fixed sum 1
        let e = ElapsedMs::from_parts(0, 59, 50);
        let resolver = Resolver::new(DigitSumSearch::Forward { max_seconds: 5 });
        let forced = resolver.resolve(e, &ForceDirective::digit_sum(2)).unwrap();
        assert_eq!(forced, ElapsedMs::from_parts(1, 0, 1));
        assert!(forced >= e);
    }

    #[test]
    fn test_digit_sum_forward_skips_passed_centis() {
        let e = ElapsedMs::from_millis(12_075);
        let resolver = Resolver::new(DigitSumSearch::Forward { max_seconds: 0 });
        // cs 07 already passed (clock is at 07.5), so 16 is next with sum 7
        assert_eq!(
            resolver.resolve(e, &ForceDirective::digit_sum(10)),
            Some(ElapsedMs::from_parts(0, 12, 16))
        );
    }

    #[test]
    fn test_list_resolves_head_only() {
        let list = ForceDirective::list(vec![ForceDirective::ms(1), ForceDirective::ms(2)]);
        let e = ElapsedMs::from_parts(0, 4, 50);
        assert_eq!(resolve(e, &list), Some(ElapsedMs::from_parts(0, 4, 1)));
        assert_eq!(resolve(e, &ForceDirective::list(vec![])), None);
    }

    #[test]
    fn test_non_time_modes_never_resolve() {
        let e = ElapsedMs::from_parts(0, 1, 0);
        assert_eq!(resolve(e, &ForceDirective::control(ControlAction::Stop)), None);
        assert_eq!(resolve(e, &ForceDirective::preset("opener")), None);
        assert!(matches!(
            Resolver::default().resolve_strict(e, &ForceDirective::preset("opener")),
            Err(TempraError::UnresolvableForce { mode: Mode::Preset })
        ));
    }

    #[test]
    fn test_search_strategy_config_shape() {
        let forward: DigitSumSearch =
            serde_json::from_str(r#"{"strategy":"forward","max_seconds":5}"#).unwrap();
        assert_eq!(forward, DigitSumSearch::Forward { max_seconds: 5 });
        let same: DigitSumSearch = serde_json::from_str(r#"{"strategy":"same_second"}"#).unwrap();
        assert_eq!(same, DigitSumSearch::SameSecond);
    }

    #[test]
    fn test_preview_text() {
        let e = ElapsedMs::from_parts(0, 3, 99);
        assert_eq!(
            preview(e, &ForceDirective::ms(15), &Resolver::default()),
            "00:03,99 -> 00:03,15"
        );
        assert_eq!(
            preview(e, &ForceDirective::digit_sum(60), &Resolver::default()),
            "00:03,99 -> unresolvable (s 60)"
        );
    }

    proptest! {
        #[test]
        fn prop_ms_sets_centis_only(ms in 0u64..10_000_000, t in 0i64..=99) {
            let e = ElapsedMs::from_millis(ms);
            let forced = resolve(e, &ForceDirective::ms(t)).unwrap();
            prop_assert_eq!(forced.centis(), t as u64);
            prop_assert_eq!(forced.as_millis() % 1_000, t as u64 * 10);
            prop_assert_eq!(forced.whole_seconds(), e.whole_seconds());
        }

        #[test]
        fn prop_ft_minutes_always_zero(ms in 0u64..10_000_000, ss in 0u64..60, cs in 0u64..100) {
            let target = format!("{:02}{:02}", ss, cs);
            let forced = resolve(ElapsedMs::from_millis(ms), &ForceDirective::ft(&target)).unwrap();
            prop_assert_eq!(forced.parts(), (0, ss, cs));
        }

        #[test]
        fn prop_digit_sum_round_trips(ms in 0u64..10_000_000, t in 0i64..60) {
            let e = ElapsedMs::from_millis(ms);
            if let Some(forced) = resolve(e, &ForceDirective::digit_sum(t)) {
                prop_assert_eq!(display_digit_sum(forced), t as u64);
                prop_assert_eq!(forced.whole_seconds(), e.whole_seconds());
            }
        }

        #[test]
        fn prop_forward_search_never_goes_back(
            ms in 0u64..10_000_000,
            t in 0i64..60,
            max in 0u64..6,
        ) {
            let e = ElapsedMs::from_millis(ms);
            let resolver = Resolver::new(DigitSumSearch::Forward { max_seconds: max });
            if let Some(forced) = resolver.resolve(e, &ForceDirective::digit_sum(t)) {
                prop_assert!(forced >= e);
                prop_assert_eq!(display_digit_sum(forced), t as u64);
            }
        }
    }
}
