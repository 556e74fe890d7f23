//! Provider fallback expressed as data: an ordered list of steps, each naming
//! the failure classes of the previous attempt that allow it to run.

use std::fmt;
use std::future::Future;

use tracing::{debug, warn};

use crate::error::{Error, FailureClass};
use crate::news::NewsSource;
use crate::provider::{NewsProviderId, PriceProviderId};

/// One provider attempt within a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackStep<P> {
    pub provider: P,
    /// Failure classes of the previous attempt that make this step eligible.
    /// Ignored for the first step.
    pub after: &'static [FailureClass],
    /// Call the provider without a credential.
    pub keyless: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackPlan<P> {
    steps: Vec<FallbackStep<P>>,
}

/// Successful run. `failures` holds every attempt that failed before `provider` answered.
#[derive(Debug)]
pub struct PlanSuccess<T, P> {
    pub data: T,
    pub provider: P,
    pub failures: Vec<(P, Error)>,
}

impl<T, P> PlanSuccess<T, P> {
    pub fn used_fallback(&self) -> bool {
        !self.failures.is_empty()
    }

    /// The first (primary) failure, if a fallback answered.
    pub fn primary_error(&self) -> Option<&Error> {
        self.failures.first().map(|(_, e)| e)
    }
}

/// Every eligible step failed. Never empty.
#[derive(Debug)]
pub struct PlanFailure<P> {
    pub failures: Vec<(P, Error)>,
}

impl<P> PlanFailure<P> {
    pub fn attempts(&self) -> usize {
        self.failures.len()
    }

    /// A lone primary failure is returned as-is so its class reaches the caller.
    /// Once a fallback has also failed the result is `DataUnavailable`, carrying
    /// the last real message.
    pub fn into_error(mut self) -> Error {
        match self.failures.len() {
            0 => Error::DataUnavailable("no provider attempted".into()),
            1 => self.failures.remove(0).1,
            _ => self.into_unavailable(),
        }
    }

    pub fn into_unavailable(self) -> Error {
        match self.failures.last() {
            Some((_, err)) => Error::unavailable(err),
            None => Error::DataUnavailable("no provider attempted".into()),
        }
    }
}

impl<P: Copy + PartialEq + fmt::Display> FallbackPlan<P> {
    pub fn new(primary: P) -> Self {
        Self {
            steps: vec![FallbackStep {
                provider: primary,
                after: &[],
                keyless: false,
            }],
        }
    }

    /// Append a step tried only when the previous attempt failed with one of `after`.
    pub fn then(mut self, provider: P, after: &'static [FailureClass], keyless: bool) -> Self {
        self.steps.push(FallbackStep {
            provider,
            after,
            keyless,
        });
        self
    }

    pub fn steps(&self) -> &[FallbackStep<P>] {
        &self.steps
    }

    pub fn primary(&self) -> P {
        self.steps[0].provider
    }

    /// Run the steps in order. Calls are sequential: a fallback starts only after
    /// the previous attempt has definitively failed.
    pub async fn run<T, F, Fut>(&self, mut call: F) -> Result<PlanSuccess<T, P>, PlanFailure<P>>
    where
        F: FnMut(FallbackStep<P>) -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let mut failures: Vec<(P, Error)> = Vec::new();

        for (i, step) in self.steps.iter().enumerate() {
            if let Some((prev, err)) = failures.last() {
                let class = err.class();
                if !step.after.contains(&class) {
                    debug!(
                        provider = %prev,
                        class = class.as_str(),
                        skipped = %step.provider,
                        "failure not eligible for fallback"
                    );
                    break;
                }
                warn!(
                    from = %prev,
                    to = %step.provider,
                    class = class.as_str(),
                    error = %err,
                    "falling back to next provider"
                );
            }

            match call(*step).await {
                Ok(data) => {
                    if i > 0 {
                        debug!(provider = %step.provider, step = i, "fallback provider answered");
                    }
                    return Ok(PlanSuccess {
                        data,
                        provider: step.provider,
                        failures,
                    });
                }
                Err(err) => failures.push((step.provider, err)),
            }
        }

        Err(PlanFailure { failures })
    }
}

/// Listings: one fallback on transient failures. CoinGecko is the keyless
/// fallback for keyed providers; CoinGecko itself falls back to CryptoCompare's
/// free tier.
pub fn listings_plan(primary: PriceProviderId) -> FallbackPlan<PriceProviderId> {
    let fallback = match primary {
        PriceProviderId::CoinGecko => PriceProviderId::CryptoCompare,
        _ => PriceProviderId::CoinGecko,
    };
    FallbackPlan::new(primary).then(fallback, FailureClass::TRANSIENT, true)
}

/// Quotes: the primary, then CoinGecko once on any failure but a rejected key.
/// Without a primary credential the plan is CoinGecko alone.
pub fn quotes_plan(primary: PriceProviderId, has_credential: bool) -> FallbackPlan<PriceProviderId> {
    if primary == PriceProviderId::CoinGecko || !has_credential {
        return FallbackPlan::new(PriceProviderId::CoinGecko);
    }
    FallbackPlan::new(primary).then(PriceProviderId::CoinGecko, FailureClass::UNLESS_AUTH, true)
}

/// News: an explicitly selected NewsAPI or custom feed is authoritative. Only
/// the default wire may be replaced by the static set.
pub fn news_plan(active: NewsProviderId) -> FallbackPlan<NewsSource> {
    match active {
        NewsProviderId::NewsApi => FallbackPlan::new(NewsSource::NewsApi),
        NewsProviderId::Custom => FallbackPlan::new(NewsSource::Custom),
        NewsProviderId::CryptoCompare => FallbackPlan::new(NewsSource::CryptoCompare).then(
            NewsSource::Static,
            FailureClass::UNLESS_AUTH,
            true,
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::error::PRICE_KEY_HINT;

    fn auth() -> Error {
        Error::Auth {
            provider: "CoinMarketCap",
            hint: PRICE_KEY_HINT,
        }
    }

    #[test]
    fn listings_plans_pick_one_keyless_fallback() {
        let plan = listings_plan(PriceProviderId::CoinMarketCap);
        assert_eq!(plan.steps().len(), 2);
        assert_eq!(plan.steps()[1].provider, PriceProviderId::CoinGecko);
        assert!(plan.steps()[1].keyless);
        assert_eq!(plan.steps()[1].after, FailureClass::TRANSIENT);

        let plan = listings_plan(PriceProviderId::CoinGecko);
        assert_eq!(plan.steps()[1].provider, PriceProviderId::CryptoCompare);
    }

    #[test]
    fn quotes_plan_skips_primary_without_credential() {
        let plan = quotes_plan(PriceProviderId::CoinMarketCap, false);
        assert_eq!(plan.primary(), PriceProviderId::CoinGecko);
        assert_eq!(plan.steps().len(), 1);

        let plan = quotes_plan(PriceProviderId::CoinMarketCap, true);
        assert_eq!(plan.steps().len(), 2);
        assert_eq!(plan.steps()[1].after, FailureClass::UNLESS_AUTH);
    }

    #[test]
    fn only_the_default_news_wire_has_a_static_fallback() {
        assert_eq!(news_plan(NewsProviderId::NewsApi).steps().len(), 1);
        assert_eq!(news_plan(NewsProviderId::Custom).steps().len(), 1);

        let plan = news_plan(NewsProviderId::CryptoCompare);
        assert_eq!(plan.steps()[1].provider, NewsSource::Static);
        assert!(plan.steps()[1].after.contains(&FailureClass::NoArticles));
        assert!(!plan.steps()[1].after.contains(&FailureClass::Auth));
    }

    #[tokio::test]
    async fn transient_failure_runs_exactly_one_fallback() {
        let calls = RefCell::new(Vec::new());
        let plan = listings_plan(PriceProviderId::CoinMarketCap);

        let result = plan
            .run(|step| {
                calls.borrow_mut().push(step.provider);
                async move {
                    match step.provider {
                        PriceProviderId::CoinMarketCap => Err(Error::RateLimited {
                            provider: "CoinMarketCap",
                            hint: PRICE_KEY_HINT,
                        }),
                        _ => Ok("listings"),
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result.provider, PriceProviderId::CoinGecko);
        assert!(result.used_fallback());
        assert!(matches!(result.primary_error(), Some(Error::RateLimited { .. })));
        assert_eq!(
            *calls.borrow(),
            vec![PriceProviderId::CoinMarketCap, PriceProviderId::CoinGecko]
        );
    }

    #[tokio::test]
    async fn auth_failure_is_terminal() {
        let calls = RefCell::new(0);
        let plan = listings_plan(PriceProviderId::CoinMarketCap);

        let failure = plan
            .run(|_| {
                *calls.borrow_mut() += 1;
                async { Err::<(), _>(auth()) }
            })
            .await
            .unwrap_err();

        assert_eq!(*calls.borrow(), 1);
        assert_eq!(failure.attempts(), 1);
        assert!(matches!(failure.into_error(), Error::Auth { .. }));
    }

    #[tokio::test]
    async fn exhausted_plan_reports_last_real_error() {
        let plan = listings_plan(PriceProviderId::CoinGecko);

        let failure = plan
            .run(|step| async move {
                Err::<(), _>(match step.provider {
                    PriceProviderId::CoinGecko => Error::Server {
                        provider: "CoinGecko",
                        status: 503,
                        hint: PRICE_KEY_HINT,
                    },
                    _ => Error::Timeout {
                        provider: "CryptoCompare",
                        secs: 10,
                        hint: PRICE_KEY_HINT,
                    },
                })
            })
            .await
            .unwrap_err();

        assert_eq!(failure.attempts(), 2);
        let err = failure.into_error();
        assert!(matches!(err, Error::DataUnavailable(ref msg) if msg.contains("CryptoCompare") && msg.contains(PRICE_KEY_HINT)));
        assert_eq!(err.status_code(), 500);
    }
}
