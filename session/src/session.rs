//! Interactive session: one grid, its display overlay, and its playback.
//!
//! This is the state a front end drives. Clicks paint according to the
//! current [`PaintMode`]; a run snapshots the grid, computes the trace and
//! hands it to the scheduler, whose callbacks update the overlay before
//! reaching the caller. While a playback is live the grid is frozen so the
//! overlay never describes a grid other than the one searched.

use std::str::FromStr;
use std::sync::Arc;

use gridpath_core::{GridModel, Outcome, Position, TraversalEngine, TraversalEvent};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{info, warn};

use crate::error::{Result, SessionError};
use crate::scheduler::{PlaybackHandle, StepScheduler};
use crate::settings::Settings;

/// What a click does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaintMode {
    #[default]
    Wall,
    Start,
    End,
}

impl FromStr for PaintMode {
    type Err = SessionError;

    /// Accepts "wall", "start", "end" (case-insensitive).
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "wall" => Ok(PaintMode::Wall),
            "start" => Ok(PaintMode::Start),
            "end" => Ok(PaintMode::End),
            other => Err(SessionError::InvalidMode(other.to_string())),
        }
    }
}

/// Display overlay left behind by playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mark {
    #[default]
    None,
    Visited,
    Path,
}

pub struct Session {
    grid: GridModel,
    marks: Arc<Mutex<Vec<Mark>>>,
    mode: PaintMode,
    settings: Settings,
    engine: TraversalEngine,
    scheduler: StepScheduler,
}

impl Session {
    /// New session on the tokio runtime of the calling context.
    pub fn new(settings: Settings) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| SessionError::NoRuntime)?;
        Self::with_runtime(settings, runtime)
    }

    pub fn with_runtime(settings: Settings, runtime: Handle) -> Result<Self> {
        settings.validate()?;
        let grid = GridModel::new(settings.rows, settings.cols);
        let cells = settings.rows * settings.cols;
        Ok(Self {
            grid,
            marks: Arc::new(Mutex::new(vec![Mark::None; cells])),
            mode: PaintMode::default(),
            settings,
            engine: TraversalEngine::new(),
            scheduler: StepScheduler::new(runtime),
        })
    }

    pub fn grid(&self) -> &GridModel {
        &self.grid
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn mode(&self) -> PaintMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PaintMode) {
        self.mode = mode;
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.is_active()
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.is_playing() {
            return Err(SessionError::PlaybackActive);
        }
        Ok(())
    }

    /// Change playback speed for the next run.
    pub fn set_speed(&mut self, speed: u64) -> Result<()> {
        self.ensure_idle()?;
        self.settings.set_speed(speed);
        Ok(())
    }

    /// Apply the current paint mode to `pos`.
    pub fn click(&mut self, pos: Position) -> Result<()> {
        self.ensure_idle()?;
        match self.mode {
            PaintMode::Wall => self.grid.toggle_wall(pos)?,
            PaintMode::Start => self.grid.set_start(pos)?,
            PaintMode::End => self.grid.set_end(pos)?,
        }
        Ok(())
    }

    /// Search the current grid and start replaying the trace.
    ///
    /// Marks from a previous run are cleared first. `on_event` sees each
    /// event after the overlay has been updated for it; `on_complete`
    /// receives the outcome unless the playback is cancelled.
    pub fn run<E, C>(&mut self, mut on_event: E, on_complete: C) -> Result<PlaybackHandle>
    where
        E: FnMut(&TraversalEvent) + Send + 'static,
        C: FnOnce(Outcome) + Send + 'static,
    {
        self.ensure_idle()?;
        self.clear_marks();

        let result = self.engine.run(&self.grid).inspect_err(|err| {
            warn!(%err, "run rejected");
        })?;

        // Endpoint cells keep their own look.
        let (start, end) = (self.grid.start(), self.grid.end());
        let cols = self.grid.cols();
        let marks = Arc::clone(&self.marks);
        let apply = move |event: &TraversalEvent| {
            let pos = event.pos();
            if Some(pos) == start || Some(pos) == end {
                return;
            }
            let mark = match event {
                TraversalEvent::Visit { .. } => Mark::Visited,
                TraversalEvent::PathStep { .. } => Mark::Path,
            };
            marks.lock()[pos.row * cols + pos.col] = mark;
        };

        let path_len = result.path_steps().count();
        let handle = self.scheduler.play(
            result,
            self.settings.delay(),
            move |event| {
                apply(event);
                on_event(event);
            },
            move |outcome| {
                match outcome {
                    Outcome::PathFound => info!(path_len, "path found"),
                    Outcome::NoPathFound => info!("No Path Found!"),
                }
                on_complete(outcome);
            },
        );
        Ok(handle)
    }

    /// Stop the live playback. Marks already drawn stay.
    pub fn cancel(&mut self) -> bool {
        self.scheduler.cancel()
    }

    /// Remove visited and path marks, keeping walls and endpoints.
    pub fn clear_visited(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.clear_marks();
        Ok(())
    }

    /// Stop any playback and return to an empty grid.
    pub fn clear_grid(&mut self) {
        self.scheduler.cancel();
        self.grid.reset();
        self.clear_marks();
    }

    fn clear_marks(&self) {
        self.marks.lock().fill(Mark::None);
    }

    pub fn mark_at(&self, pos: Position) -> Option<Mark> {
        if !self.grid.contains(pos) {
            return None;
        }
        Some(self.marks.lock()[pos.row * self.grid.cols() + pos.col])
    }

    /// One line per row: `S` start, `E` end, `#` wall, `*` path,
    /// `o` visited, `.` empty.
    pub fn render(&self) -> String {
        let marks = self.marks.lock();
        let cols = self.grid.cols();
        let mut out = String::with_capacity(self.grid.rows() * (cols + 1));
        for row in 0..self.grid.rows() {
            for col in 0..cols {
                let pos = Position::new(row, col);
                let ch = if self.grid.is_start(pos) {
                    'S'
                } else if self.grid.is_end(pos) {
                    'E'
                } else if !self.grid.is_passable(pos) {
                    '#'
                } else {
                    match marks[row * cols + col] {
                        Mark::Path => '*',
                        Mark::Visited => 'o',
                        Mark::None => '.',
                    }
                };
                out.push(ch);
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn p(row: usize, col: usize) -> Position {
        Position::new(row, col)
    }

    fn small_settings(rows: usize, cols: usize) -> Settings {
        Settings {
            rows,
            cols,
            delay_ms: 10,
            ..Settings::default()
        }
    }

    fn paint(session: &mut Session, mode: PaintMode, cells: &[(usize, usize)]) {
        session.set_mode(mode);
        for &(r, c) in cells {
            session.click(p(r, c)).unwrap();
        }
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("wall".parse::<PaintMode>().unwrap(), PaintMode::Wall);
        assert_eq!("START".parse::<PaintMode>().unwrap(), PaintMode::Start);
        assert_eq!(" End ".parse::<PaintMode>().unwrap(), PaintMode::End);
        assert!(matches!(
            "diagonal".parse::<PaintMode>(),
            Err(SessionError::InvalidMode(m)) if m == "diagonal"
        ));
    }

    #[test]
    fn test_new_without_runtime() {
        assert!(matches!(
            Session::new(Settings::default()),
            Err(SessionError::NoRuntime)
        ));
    }

    #[tokio::test]
    async fn test_rejects_invalid_settings() {
        let settings = Settings {
            cols: 0,
            ..Settings::default()
        };
        assert!(matches!(Session::new(settings), Err(SessionError::Settings(_))));
    }

    #[tokio::test]
    async fn test_click_modes() {
        let mut s = Session::new(small_settings(3, 3)).unwrap();
        paint(&mut s, PaintMode::Wall, &[(1, 1), (0, 2)]);
        paint(&mut s, PaintMode::Start, &[(1, 1)]);
        paint(&mut s, PaintMode::End, &[(2, 2)]);
        paint(&mut s, PaintMode::Wall, &[(1, 1), (2, 2)]);

        assert_eq!(s.render(), "..#\n.S.\n..E\n");
        assert!(matches!(
            s.click(p(3, 0)),
            Err(SessionError::Grid(gridpath_core::Error::OutOfBounds { .. }))
        ));
    }

    #[tokio::test]
    async fn test_run_requires_endpoints() {
        let mut s = Session::new(small_settings(3, 3)).unwrap();
        paint(&mut s, PaintMode::Start, &[(0, 0)]);
        let err = s.run(|_| {}, |_| {}).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Grid(gridpath_core::Error::MissingEndpoints {
                start_set: true,
                end_set: false
            })
        ));
        assert!(err.to_string().starts_with("Set Start and End nodes!"));
        assert!(!s.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_draws_overlay() {
        let mut s = Session::new(small_settings(3, 3)).unwrap();
        paint(&mut s, PaintMode::Start, &[(0, 0)]);
        paint(&mut s, PaintMode::End, &[(2, 2)]);

        let seen = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&seen);
        let handle = s.run(move |_| *counter.lock() += 1, |_| {}).unwrap();
        assert!(s.is_playing());
        assert_eq!(handle.finished().await, Some(Outcome::PathFound));

        assert!(!s.is_playing());
        // 8 visits then 5 path steps
        assert_eq!(*seen.lock(), 13);
        assert_eq!(s.render(), "Soo\n*oo\n**E\n");
        assert_eq!(s.mark_at(p(0, 0)), Some(Mark::None));
        assert_eq!(s.mark_at(p(2, 1)), Some(Mark::Path));
        assert_eq!(s.mark_at(p(0, 2)), Some(Mark::Visited));
        assert_eq!(s.mark_at(p(5, 5)), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_path_outcome() {
        let mut s = Session::new(small_settings(3, 3)).unwrap();
        paint(&mut s, PaintMode::Start, &[(0, 0)]);
        paint(&mut s, PaintMode::End, &[(2, 2)]);
        paint(&mut s, PaintMode::Wall, &[(1, 2), (2, 1)]);

        let outcome = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&outcome);
        let handle = s.run(|_| {}, move |o| *slot.lock() = Some(o)).unwrap();
        handle.finished().await;

        assert_eq!(*outcome.lock(), Some(Outcome::NoPathFound));
        assert_eq!(s.render(), "Soo\noo#\no#E\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_blocked_while_playing() {
        let mut s = Session::new(small_settings(4, 4)).unwrap();
        paint(&mut s, PaintMode::Start, &[(0, 0)]);
        paint(&mut s, PaintMode::End, &[(3, 3)]);
        let _handle = s.run(|_| {}, |_| {}).unwrap();

        assert!(matches!(s.click(p(1, 1)), Err(SessionError::PlaybackActive)));
        assert!(matches!(s.set_speed(50), Err(SessionError::PlaybackActive)));
        assert!(matches!(s.clear_visited(), Err(SessionError::PlaybackActive)));
        assert!(matches!(s.run(|_| {}, |_| {}), Err(SessionError::PlaybackActive)));

        tokio::time::sleep(Duration::from_millis(15)).await;
        assert!(s.cancel());
        assert!(!s.is_playing());
        s.set_mode(PaintMode::Wall);
        s.click(p(1, 1)).unwrap();
        assert_eq!(s.grid().wall_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rerun_clears_previous_marks() {
        let mut s = Session::new(small_settings(3, 3)).unwrap();
        paint(&mut s, PaintMode::Start, &[(0, 0)]);
        paint(&mut s, PaintMode::End, &[(2, 2)]);
        s.run(|_| {}, |_| {}).unwrap().finished().await;

        paint(&mut s, PaintMode::End, &[(0, 1)]);
        s.run(|_| {}, |_| {}).unwrap().finished().await;
        // (1,0) is dequeued before End and discovers (2,0) and (1,1).
        assert_eq!(s.render(), "SE.\noo.\no..\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_grid_cancels_and_resets() {
        let mut s = Session::new(small_settings(3, 3)).unwrap();
        paint(&mut s, PaintMode::Start, &[(0, 0)]);
        paint(&mut s, PaintMode::End, &[(2, 2)]);
        paint(&mut s, PaintMode::Wall, &[(1, 1)]);

        let completed = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&completed);
        let handle = s.run(|_| {}, move |_| *flag.lock() = true).unwrap();
        tokio::time::sleep(Duration::from_millis(15)).await;

        s.clear_grid();
        assert!(!s.is_playing());
        assert_eq!(handle.finished().await, None);
        assert!(!*completed.lock());
        assert_eq!(s.render(), "...\n...\n...\n");
        assert_eq!(s.grid().start(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_callback_unlocks_session() {
        let mut s = Session::new(small_settings(3, 3)).unwrap();
        paint(&mut s, PaintMode::Start, &[(0, 0)]);
        paint(&mut s, PaintMode::End, &[(2, 2)]);
        let handle = s.run(|_| panic!("front end failed"), |_| {}).unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(handle.is_finished());
        assert!(!s.is_playing());
        paint(&mut s, PaintMode::Wall, &[(1, 1)]);
        s.set_speed(60).unwrap();
        assert_eq!(s.grid().wall_count(), 1);

        let outcome = s.run(|_| {}, |_| {}).unwrap().finished().await;
        assert_eq!(outcome, Some(Outcome::PathFound));
    }

    #[tokio::test]
    async fn test_set_speed_between_runs() {
        let mut s = Session::new(small_settings(2, 2)).unwrap();
        s.set_speed(100).unwrap();
        assert_eq!(s.settings().delay(), Duration::from_millis(5));
    }
}
