//! 외부 API 호출용 토큰 버킷.
//!
//! Tushare는 계정별 분당 호출 한도가 있어서 게이트웨이마다 버킷 하나를 두고
//! 모든 요청 전에 [`TokenBucket::acquire`]를 호출합니다.
//!
//! 토큰이 부족하면 토큰 1개가 찰 때까지 기다린 뒤 바로 진행합니다.
//! 깨어난 뒤 다시 확인하지 않으며, 대기 중에도 잠금을 쥐고 있으므로
//! 뒤에 온 호출자는 앞 호출자의 대기가 끝날 때까지 줄을 섭니다.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// 버킷 상태 (잠금 안에서만 변경).
#[derive(Debug)]
struct BucketState {
    /// 현재 토큰 수
    tokens: f64,
    /// 마지막 충전 시각
    last_refill: Instant,
}

/// 비동기 토큰 버킷.
#[derive(Debug)]
pub struct TokenBucket {
    /// 최대 토큰 수 (버스트 크기)
    capacity: f64,
    /// 초당 충전되는 토큰 수
    refill_rate: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// 용량과 분당 충전 토큰 수로 버킷을 생성합니다. 처음에는 가득 찬 상태입니다.
    ///
    /// `tokens_per_minute`가 0이면 1로 취급합니다.
    pub fn new(capacity: u32, tokens_per_minute: u32) -> Self {
        let capacity = f64::from(capacity.max(1));
        Self {
            capacity,
            refill_rate: f64::from(tokens_per_minute.max(1)) / 60.0,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// 분당 호출 한도 하나로 버킷을 생성합니다 (용량 = 분당 한도).
    pub fn per_minute(calls_per_minute: u32) -> Self {
        Self::new(calls_per_minute, calls_per_minute)
    }

    /// 토큰 하나를 소비합니다. 부족하면 필요한 만큼 기다립니다.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;

        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_rate).min(self.capacity);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            return;
        }

        let wait = Duration::from_secs_f64((1.0 - state.tokens) / self.refill_rate);
        debug!(wait_ms = wait.as_millis() as u64, "Rate limit reached, waiting for token");
        tokio::time::sleep(wait).await;

        state.tokens = 0.0;
        state.last_refill = Instant::now();
    }

    /// 초당 충전 속도.
    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    /// 현재 남은 토큰 수 (충전 반영 전 값).
    pub async fn available(&self) -> f64 {
        self.state.lock().await.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_burst_then_wait() {
        // 용량 2, 초당 2개 충전
        let bucket = TokenBucket::new(2, 120);
        let start = Instant::now();

        bucket.acquire().await;
        bucket.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(10));

        bucket.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokens_reset_after_wait() {
        let bucket = TokenBucket::new(1, 60);
        let start = Instant::now();

        bucket.acquire().await;
        bucket.acquire().await;
        bucket.acquire().await;

        // 대기 후 토큰을 0으로 두므로 호출마다 1초씩 기다립니다.
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert_eq!(bucket.available().await, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_is_capped() {
        let bucket = TokenBucket::new(2, 120);
        bucket.acquire().await;

        tokio::time::advance(Duration::from_secs(60)).await;

        let start = Instant::now();
        bucket.acquire().await;
        bucket.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(10));
        assert_eq!(bucket.available().await, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_between_tasks() {
        let bucket = Arc::new(TokenBucket::new(2, 120));
        let start = Instant::now();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let bucket = Arc::clone(&bucket);
                tokio::spawn(async move { bucket.acquire().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        // 2개는 즉시, 나머지 2개는 0.5초씩 순서대로 대기
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[test]
    fn test_per_minute() {
        let bucket = TokenBucket::per_minute(200);
        assert!((bucket.refill_rate() - 200.0 / 60.0).abs() < 1e-9);
    }
}
