//! Per-client request limits for the public routes.
//!
//! Each client IP gets a bucket of `max_requests` that refills evenly over
//! `window`. Clients are identified by the peer address from
//! [`ConnectInfo`]; requests without one share a single bucket.

use std::{
  net::{IpAddr, Ipv4Addr, SocketAddr},
  num::NonZeroU32,
  sync::Arc,
  time::Duration,
};

use axum::{
  extract::{ConnectInfo, Request, State},
  middleware::Next,
  response::{IntoResponse as _, Response},
};
use governor::{
  DefaultKeyedRateLimiter, Quota, RateLimiter,
  clock::{Clock as _, DefaultClock},
};
use tracing::debug;

use crate::error::ApiError;

pub struct RateLimit {
  limiter: DefaultKeyedRateLimiter<IpAddr>,
  clock:   DefaultClock,
}

impl RateLimit {
  /// `None` when `max_requests` or `window` is zero, which disables limiting.
  pub fn new(max_requests: u32, window: Duration) -> Option<Self> {
    let burst = NonZeroU32::new(max_requests)?;
    let quota = Quota::with_period(window / max_requests)?.allow_burst(burst);
    Some(Self { limiter: RateLimiter::keyed(quota), clock: DefaultClock::default() })
  }

  /// Take one request from `ip`'s bucket, or report how long until one is
  /// available.
  pub fn check(&self, ip: IpAddr) -> Result<(), Duration> {
    self
      .limiter
      .check_key(&ip)
      .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
  }

  /// Forget clients whose buckets have refilled completely.
  pub fn prune(&self) {
    self.limiter.retain_recent();
    self.limiter.shrink_to_fit();
  }

  /// Number of clients currently tracked.
  pub fn tracked(&self) -> usize { self.limiter.len() }
}

/// Middleware rejecting requests over the limit with 429.
pub async fn enforce(
  State(limit): State<Arc<RateLimit>>,
  req: Request,
  next: Next,
) -> Response {
  let ip = req
    .extensions()
    .get::<ConnectInfo<SocketAddr>>()
    .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |ConnectInfo(addr)| addr.ip());

  match limit.check(ip) {
    Ok(()) => next.run(req).await,
    Err(retry_after) => {
      debug!(%ip, ?retry_after, "rate limited");
      ApiError::RateLimited { retry_after }.into_response()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ip(last: u8) -> IpAddr { IpAddr::V4(Ipv4Addr::new(10, 0, 0, last)) }

  #[test]
  fn zero_disables_limiting() {
    assert!(RateLimit::new(0, Duration::from_secs(60)).is_none());
    assert!(RateLimit::new(10, Duration::ZERO).is_none());
  }

  #[test]
  fn burst_is_max_requests() {
    let limit = RateLimit::new(3, Duration::from_secs(3600)).unwrap();
    for _ in 0..3 {
      assert!(limit.check(ip(1)).is_ok());
    }
    let wait = limit.check(ip(1)).unwrap_err();
    assert!(wait > Duration::ZERO);
    assert!(wait <= Duration::from_secs(1200));
  }

  #[test]
  fn clients_have_separate_buckets() {
    let limit = RateLimit::new(1, Duration::from_secs(3600)).unwrap();
    assert!(limit.check(ip(1)).is_ok());
    assert!(limit.check(ip(1)).is_err());
    assert!(limit.check(ip(2)).is_ok());
    assert_eq!(limit.tracked(), 2);
  }
}
