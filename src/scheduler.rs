use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{Instant, interval, interval_at, sleep};

use crate::collector::SwitchCollector;

/// Опрос стартует на границе 10 секунд внутри минуты
pub const ALIGN_STEP: Duration = Duration::from_secs(10);

/// Сигнал остановки: `true` означает, что пора завершаться
pub type Shutdown = watch::Receiver<bool>;

/// Сколько ждать до ближайшей границы шага
pub fn until_next_boundary(now_millis: i64, step: Duration) -> Duration {
    let step_millis = step.as_millis() as i64;
    if step_millis == 0 {
        return Duration::ZERO;
    }
    let rest = now_millis.rem_euclid(step_millis);
    if rest == 0 {
        Duration::ZERO
    } else {
        Duration::from_millis((step_millis - rest) as u64)
    }
}

/// Ждёт до `wait`, возвращает false, если за это время пришла остановка
async fn sleep_or_shutdown(wait: Duration, shutdown: &mut Shutdown) -> bool {
    if *shutdown.borrow() {
        return false;
    }
    tokio::select! {
        _ = sleep(wait) => true,
        _ = shutdown.changed() => false,
    }
}

/// Цикл опроса. Неудачный цикл просто пропускается, повтор будет на следующем тике.
/// Фатальная ошибка (не счётчик в ответе) останавливает весь процесс.
pub async fn run_collect_loop(
    collector: Arc<SwitchCollector>,
    period: Duration,
    mut shutdown: Shutdown,
    stop: Arc<watch::Sender<bool>>,
) -> Result<()> {
    let wait = until_next_boundary(Utc::now().timestamp_millis(), ALIGN_STEP);
    tracing::info!(wait_ms = wait.as_millis() as u64, "Ждём границу 10 секунд");
    if !sleep_or_shutdown(wait, &mut shutdown).await {
        return Ok(());
    }

    // первый тик срабатывает сразу; если цикл затянулся, тики копятся
    let mut tick = interval(period);
    loop {
        tokio::select! {
            _ = tick.tick() => {
                if let Err(e) = collector.collect().await {
                    if e.is_fatal() {
                        tracing::error!(error = %e, "Фатальная ошибка опроса, останавливаемся");
                        stop.send_replace(true);
                        return Err(e.into());
                    }
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    tracing::info!("Опрос остановлен");
    Ok(())
}

/// Цикл записи архива. При остановке делает последнюю запись,
/// чтобы не потерять накопленное.
pub async fn run_flush_loop(collector: Arc<SwitchCollector>, period: Duration, mut shutdown: Shutdown) {
    let mut tick = interval_at(Instant::now() + period, period);
    let mut last_flush = Instant::now();

    loop {
        tokio::select! {
            _ = tick.tick() => {
                // ошибка уже в логе, буферы сохранены до следующей записи
                if collector.flush(period).await.is_ok() {
                    last_flush = Instant::now();
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    if let Err(e) = collector.flush(last_flush.elapsed()).await {
        tracing::error!(error = %format!("{:#}", e), "Последняя запись архива не удалась");
    }
    tracing::info!("Запись архива остановлена");
}
