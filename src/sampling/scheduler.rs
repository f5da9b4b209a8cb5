use std::time::Duration;

use crate::models::WindowTab;
use crate::settings::SamplingSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No marketplace window visible.
    Idle,
    Sampling,
    /// Fast sampling right after the market window changed.
    BurstSampling { remaining: u32 },
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    state: SchedulerState,
    last_tab: Option<WindowTab>,
    idle_interval: Duration,
    sampling_interval: Duration,
    burst_interval: Duration,
    burst_ticks: u32,
}

impl Scheduler {
    pub fn new(settings: &SamplingSettings) -> Self {
        Self {
            state: SchedulerState::Idle,
            last_tab: None,
            idle_interval: Duration::from_millis(settings.idle_interval_ms),
            sampling_interval: Duration::from_millis(settings.sampling_interval_ms),
            burst_interval: Duration::from_millis(settings.burst_interval_ms),
            burst_ticks: settings.burst_ticks,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Delay before the next capture.
    pub fn interval(&self) -> Duration {
        match self.state {
            SchedulerState::Idle => self.idle_interval,
            SchedulerState::Sampling => self.sampling_interval,
            SchedulerState::BurstSampling { .. } => self.burst_interval,
        }
    }

    /// Feed the tab seen by the latest capture (`None` when nothing was
    /// captured) and move to the next state.
    pub fn observe(&mut self, tab: Option<WindowTab>) -> SchedulerState {
        let market_tab = tab.filter(WindowTab::is_market);
        let changed = market_tab != self.last_tab;
        self.last_tab = market_tab;

        self.state = match (market_tab, self.state) {
            (None, _) => SchedulerState::Idle,
            (Some(_), _) if changed && self.burst_ticks > 0 => SchedulerState::BurstSampling {
                remaining: self.burst_ticks,
            },
            (Some(_), SchedulerState::BurstSampling { remaining }) if remaining > 1 => {
                SchedulerState::BurstSampling {
                    remaining: remaining - 1,
                }
            }
            (Some(_), _) => SchedulerState::Sampling,
        };
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler(burst_ticks: u32) -> Scheduler {
        Scheduler::new(&SamplingSettings {
            burst_ticks,
            ..SamplingSettings::default()
        })
    }

    #[test]
    fn window_change_triggers_burst_then_settles() {
        let mut scheduler = scheduler(2);
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        assert_eq!(
            scheduler.observe(Some(WindowTab::Sell)),
            SchedulerState::BurstSampling { remaining: 2 }
        );
        assert_eq!(
            scheduler.observe(Some(WindowTab::Sell)),
            SchedulerState::BurstSampling { remaining: 1 }
        );
        assert_eq!(scheduler.observe(Some(WindowTab::Sell)), SchedulerState::Sampling);
        assert_eq!(scheduler.interval(), Duration::from_millis(1_000));

        assert_eq!(
            scheduler.observe(Some(WindowTab::Buy)),
            SchedulerState::BurstSampling { remaining: 2 }
        );
        assert_eq!(scheduler.interval(), Duration::from_millis(250));
    }

    #[test]
    fn leaving_the_market_goes_idle() {
        let mut scheduler = scheduler(2);
        scheduler.observe(Some(WindowTab::Overview));
        assert_eq!(scheduler.observe(None), SchedulerState::Idle);
        assert_eq!(scheduler.observe(Some(WindowTab::Unknown)), SchedulerState::Idle);
        assert_eq!(scheduler.interval(), Duration::from_millis(2_000));
    }

    #[test]
    fn zero_burst_ticks_samples_directly() {
        let mut scheduler = scheduler(0);
        assert_eq!(scheduler.observe(Some(WindowTab::Sell)), SchedulerState::Sampling);
    }
}
