use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Once};
use std::time::{Duration, Instant};

use crate::component::{
    AudioContribution, Component, ComponentError, Properties, Property, RenderContext,
};
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::{Canvas, FrameIndex};
use crate::foundation::error::{ComponentFailure, ComponentPhase};
use crate::render::frame::FrameRGBA;

const DUPLICATE_WINDOW: Duration = Duration::from_secs(1);

/// Rate limiter for failure reports shared by every host of one stack.
///
/// A failure is reported when no failure with the same phase was reported during the last second.
#[derive(Debug, Default)]
pub struct FailureLog {
    last: Mutex<HashMap<ComponentPhase, Instant>>,
}

impl FailureLog {
    /// Return `true` when a failure in `phase` should be reported now.
    pub fn should_report(&self, phase: ComponentPhase) -> bool {
        self.should_report_at(phase, Instant::now())
    }

    fn should_report_at(&self, phase: ComponentPhase, now: Instant) -> bool {
        let Ok(mut last) = self.last.lock() else {
            return true;
        };
        match last.get(&phase) {
            Some(prev) if now.saturating_duration_since(*prev) < DUPLICATE_WINDOW => false,
            _ => {
                last.insert(phase, now);
                true
            }
        }
    }
}

/// Owns one component at a fixed stack position and isolates its failures.
///
/// Every call into the component runs under `catch_unwind`; errors and panics come back as
/// [`ComponentFailure`] values carrying the component name, position and phase.
pub struct ComponentHost {
    component: Box<dyn Component>,
    position: usize,
    name: String,
    failures: Arc<FailureLog>,
    prepared: bool,
}

impl ComponentHost {
    /// Wrap `component` at stack `position`.
    pub fn new(component: Box<dyn Component>, position: usize, failures: Arc<FailureLog>) -> Self {
        let name = component.name().to_owned();
        Self {
            component,
            position,
            name,
            failures,
            prepared: false,
        }
    }

    /// Wrap a whole stack (index 0 is the bottom layer) sharing one [`FailureLog`].
    pub fn wrap_stack(components: Vec<Box<dyn Component>>) -> Vec<ComponentHost> {
        let failures = Arc::new(FailureLog::default());
        components
            .into_iter()
            .enumerate()
            .map(|(pos, c)| ComponentHost::new(c, pos, failures.clone()))
            .collect()
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stack position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// `true` once `pre_frame_render` has been invoked and not yet torn down.
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Query capability flags.
    pub fn properties(&self) -> Result<Properties, ComponentFailure> {
        let res = isolate(|| self.component.properties());
        res.map_err(|d| self.failure(ComponentPhase::Properties, d))
    }

    /// Shorthand for `properties()?.contains(p)`.
    pub fn has(&self, p: Property) -> Result<bool, ComponentFailure> {
        Ok(self.properties()?.contains(p))
    }

    /// Query the misconfiguration message.
    pub fn error_message(&self) -> Result<ComponentError, ComponentFailure> {
        let res = isolate(|| self.component.error());
        res.map_err(|d| self.failure(ComponentPhase::Error, d))
    }

    /// Run `pre_frame_render`. The host counts as prepared even when the hook fails, so that
    /// `post_frame_render` still gets a chance to release partial work.
    pub fn pre_frame_render(&mut self, ctx: &RenderContext) -> Result<(), ComponentFailure> {
        self.prepared = true;
        let component = &mut self.component;
        let res = isolate(|| component.pre_frame_render(ctx));
        res.map_err(|d| self.failure(ComponentPhase::PreFrameRender, d))
    }

    /// Render this layer for `frame`.
    ///
    /// A result whose size differs from `canvas` is logged and replaced by a transparent frame.
    pub fn frame_render(
        &self,
        frame: FrameIndex,
        canvas: Canvas,
    ) -> Result<FrameRGBA, ComponentFailure> {
        let res = isolate(|| self.component.frame_render(frame));
        let image = res.map_err(|d| self.failure(ComponentPhase::FrameRender, d))?;
        Ok(self.conform(image, frame, canvas))
    }

    /// Render a composite layer from the image underneath it.
    pub fn composite_render(
        &self,
        frame: FrameIndex,
        below: FrameRGBA,
        canvas: Canvas,
    ) -> Result<FrameRGBA, ComponentFailure> {
        let res = isolate(|| self.component.composite_render(frame, below));
        let image = res.map_err(|d| self.failure(ComponentPhase::FrameRender, d))?;
        Ok(self.conform(image, frame, canvas))
    }

    /// Run `post_frame_render` if this host was prepared. Runs at most once per preparation.
    pub fn post_frame_render(&mut self) -> Result<(), ComponentFailure> {
        if !self.prepared {
            return Ok(());
        }
        self.prepared = false;
        let component = &mut self.component;
        let res = isolate(|| component.post_frame_render());
        res.map_err(|d| self.failure(ComponentPhase::PostFrameRender, d))
    }

    /// Query the extra audio stream.
    pub fn audio(&self) -> Result<Option<AudioContribution>, ComponentFailure> {
        let res = isolate(|| self.component.audio());
        res.map_err(|d| self.failure(ComponentPhase::Audio, d))
    }

    /// The component's own cancellation flag, if it has one. Panics count as `None`.
    pub fn cancel_flag(&self) -> Option<CancelToken> {
        isolate(|| Ok(self.component.cancel_flag())).ok().flatten()
    }

    fn conform(&self, image: FrameRGBA, frame: FrameIndex, canvas: Canvas) -> FrameRGBA {
        if image.matches(canvas) {
            return image;
        }
        tracing::warn!(
            component = %self.name,
            position = self.position,
            frame = frame.0,
            got = %format!("{}x{}", image.width, image.height),
            expected = %format!("{}x{}", canvas.width, canvas.height),
            "component returned a frame of the wrong size; using a blank frame"
        );
        FrameRGBA::transparent(canvas.width, canvas.height)
    }

    fn failure(&self, phase: ComponentPhase, detail: String) -> ComponentFailure {
        let failure = ComponentFailure {
            name: self.name.clone(),
            position: self.position,
            phase,
            detail,
        };
        if self.failures.should_report(phase) {
            tracing::error!(
                component = %failure.name,
                position = failure.position,
                phase = %failure.phase,
                "{}",
                failure.detail
            );
        } else {
            tracing::debug!(
                component = %failure.name,
                phase = %failure.phase,
                "suppressed duplicate component failure"
            );
        }
        failure
    }
}

thread_local! {
    static ISOLATING: Cell<bool> = const { Cell::new(false) };
    static PANIC_SITE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/// Chain a panic hook that records the panic site while a hook call is isolated.
///
/// Panics outside [`isolate`] still reach the previously installed hook.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !ISOLATING.with(Cell::get) {
                previous(info);
                return;
            }
            let location = info
                .location()
                .map_or_else(|| "unknown location".to_owned(), ToString::to_string);
            let site = format!("at {location}\n\nbacktrace:\n{}", Backtrace::force_capture());
            PANIC_SITE.with(|slot| *slot.borrow_mut() = Some(site));
        }));
    });
}

fn isolate<T>(f: impl FnOnce() -> anyhow::Result<T>) -> Result<T, String> {
    install_panic_hook();
    let outer = ISOLATING.with(|flag| flag.replace(true));
    let caught = panic::catch_unwind(AssertUnwindSafe(f));
    ISOLATING.with(|flag| flag.set(outer));
    match caught {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(format!("{e:?}")),
        Err(payload) => {
            let msg = if let Some(s) = payload.downcast_ref::<&str>() {
                (*s).to_owned()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "component panicked".to_owned()
            };
            let site = PANIC_SITE
                .with(|slot| slot.borrow_mut().take())
                .unwrap_or_else(|| "panic site unavailable".to_owned());
            Err(format!("panic: {msg}\n{site}"))
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/component/host.rs"]
mod tests;
