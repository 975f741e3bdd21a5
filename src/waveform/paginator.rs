use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error};

use crate::waveform::page::{DisplayPoint, PageBuffer};
use crate::waveform::ScopeError;

pub const SINGLE_PAGE_WINDOW_SECS: f64 = 1.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageMode {
    /// The completed page is shown while the other one fills out of sight.
    Dual,
    /// One page is shown while it fills and is recycled in place.
    Single,
}

impl PageMode {
    pub fn for_window(window_secs: f64) -> Self {
        if window_secs >= SINGLE_PAGE_WINDOW_SECS {
            Self::Single
        } else {
            Self::Dual
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Dual => "dual page",
            Self::Single => "single page",
        }
    }
}

/// Which page is the write target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaginatorState {
    FillingFirst,
    FillingSecond,
}

impl PaginatorState {
    fn index(self) -> usize {
        match self {
            Self::FillingFirst => 0,
            Self::FillingSecond => 1,
        }
    }

    fn toggled(self) -> Self {
        match self {
            Self::FillingFirst => Self::FillingSecond,
            Self::FillingSecond => Self::FillingFirst,
        }
    }
}

/// Single-page handoff between the writer and the renderers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Handoff {
    Live,
    /// Page is full; new points are parked until a renderer has seen it.
    Sealed { observed: bool },
}

/// Owned copy of the renderable page.
#[derive(Clone, Debug, PartialEq)]
pub struct PageSnapshot {
    /// Advances whenever the renderable page is swapped out or recycled.
    pub generation: u64,
    pub capacity: usize,
    pub points: Vec<DisplayPoint>,
}

impl PageSnapshot {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.points.len() >= self.capacity
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PageStats {
    pub generation: u64,
    pub pages_completed: u64,
    /// Single-page mode only: sealed pages replaced before any renderer looked.
    pub pages_dropped: u64,
}

#[derive(Debug)]
struct PageSet {
    pages: [PageBuffer; 2],
    mode: PageMode,
    state: PaginatorState,
    current: usize,
    handoff: Handoff,
    stats: PageStats,
}

impl PageSet {
    fn snapshot(&mut self) -> PageSnapshot {
        if let Handoff::Sealed { observed } = &mut self.handoff {
            *observed = true;
        }
        let page = &self.pages[self.current];
        PageSnapshot {
            generation: self.stats.generation,
            capacity: page.capacity(),
            points: page.snapshot(),
        }
    }

    /// Appends one point; `Ok(true)` when a page was completed by it.
    fn push(&mut self, point: DisplayPoint) -> Result<bool, ScopeError> {
        match self.mode {
            PageMode::Dual => self.push_dual(point),
            PageMode::Single => self.push_single(point),
        }
    }

    fn push_dual(&mut self, point: DisplayPoint) -> Result<bool, ScopeError> {
        let filling = self.state.index();
        self.pages[filling].append(point)?;
        if !self.pages[filling].is_full() {
            return Ok(false);
        }
        let next = self.state.toggled();
        self.pages[next.index()].clear();
        self.current = filling;
        self.state = next;
        self.stats.generation += 1;
        self.stats.pages_completed += 1;
        Ok(true)
    }

    fn push_single(&mut self, point: DisplayPoint) -> Result<bool, ScopeError> {
        match self.handoff {
            Handoff::Live => {
                let page = &mut self.pages[0];
                page.append(point)?;
                if !page.is_full() {
                    return Ok(false);
                }
                self.handoff = Handoff::Sealed { observed: false };
                self.stats.pages_completed += 1;
                Ok(true)
            }
            Handoff::Sealed { observed: true } => {
                let [page, parked] = &mut self.pages;
                page.take_from(parked);
                self.handoff = Handoff::Live;
                self.stats.generation += 1;
                self.push_single(point)
            }
            Handoff::Sealed { observed: false } => {
                let [page, parked] = &mut self.pages;
                parked.append(point)?;
                if !parked.is_full() {
                    return Ok(false);
                }
                page.take_from(parked);
                self.stats.generation += 1;
                self.stats.pages_completed += 1;
                self.stats.pages_dropped += 1;
                debug!(
                    "page {} replaced before any renderer saw it",
                    self.stats.generation - 1
                );
                Ok(true)
            }
        }
    }
}

fn lock(shared: &Mutex<PageSet>) -> MutexGuard<'_, PageSet> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Writes reduced amplitudes into two alternating pages and hands completed
/// pages to renderers through [`PageReader`].
pub struct Paginator {
    shared: Arc<Mutex<PageSet>>,
    mode: PageMode,
    time_step: f64,
    slot: usize,
}

impl Paginator {
    pub fn new(mode: PageMode, points_per_page: usize, time_step: f64) -> Self {
        let current = match mode {
            PageMode::Dual => PaginatorState::FillingFirst.toggled().index(),
            PageMode::Single => PaginatorState::FillingFirst.index(),
        };
        let set = PageSet {
            pages: [
                PageBuffer::with_capacity(points_per_page),
                PageBuffer::with_capacity(points_per_page),
            ],
            mode,
            state: PaginatorState::FillingFirst,
            current,
            handoff: Handoff::Live,
            stats: PageStats::default(),
        };
        Self {
            shared: Arc::new(Mutex::new(set)),
            mode,
            time_step,
            slot: 0,
        }
    }

    pub fn mode(&self) -> PageMode {
        self.mode
    }

    pub fn state(&self) -> PaginatorState {
        lock(&self.shared).state
    }

    /// Time coordinate the next point will get.
    pub fn current_time(&self) -> f64 {
        self.slot as f64 * self.time_step
    }

    pub fn stats(&self) -> PageStats {
        lock(&self.shared).stats
    }

    pub fn reader(&self) -> PageReader {
        PageReader {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn append(&mut self, amplitude: i32) -> Result<DisplayPoint, ScopeError> {
        let point = DisplayPoint {
            time: self.current_time(),
            amplitude,
        };
        let completed = lock(&self.shared).push(point).map_err(|err| {
            error!("paginator rotation check skipped: {err}");
            err
        })?;
        if completed {
            self.slot = 0;
        } else {
            self.slot += 1;
        }
        Ok(point)
    }
}

/// Read side of a [`Paginator`], cheap to clone and safe to use from any thread.
#[derive(Clone, Debug)]
pub struct PageReader {
    shared: Arc<Mutex<PageSet>>,
}

impl PageReader {
    /// Copy of the page renderers should draw. Taking one also releases a
    /// sealed single-page buffer for reuse.
    pub fn renderable_page(&self) -> PageSnapshot {
        lock(&self.shared).snapshot()
    }

    pub fn stats(&self) -> PageStats {
        lock(&self.shared).stats
    }
}
