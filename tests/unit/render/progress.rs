use super::*;

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl RenderObserver for Recorder {
    fn progress(&self, percent: i32) {
        self.events.lock().unwrap().push(format!("p{percent}"));
    }

    fn progress_text(&self, text: &str) {
        self.events.lock().unwrap().push(format!("t:{text}"));
    }
}

#[test]
fn reporter_drops_duplicates_and_regressions() {
    let rec = Arc::new(Recorder::default());
    let reporter = Reporter::new(rec.clone());
    for p in [0, 0, 5, 3, 5, 7, 150] {
        reporter.progress(p);
    }
    assert_eq!(
        *rec.events.lock().unwrap(),
        vec!["p0", "p5", "p7", "p100"]
    );
}

#[test]
fn new_phase_resets_gate() {
    let rec = Arc::new(Recorder::default());
    let reporter = Reporter::new(rec.clone());
    reporter.progress(80);
    reporter.text("Rendering");
    reporter.progress(10);
    reporter.progress(-1);
    reporter.progress(-1);
    assert_eq!(
        *rec.events.lock().unwrap(),
        vec!["p80", "t:Rendering", "p10", "p-1"]
    );
}

#[test]
fn finish_is_unconditional() {
    let rec = Arc::new(Recorder::default());
    let reporter = Reporter::new(rec.clone());
    reporter.progress(60);
    reporter.finish(0, "Export Failed");
    assert_eq!(
        *rec.events.lock().unwrap(),
        vec!["p60", "p0", "t:Export Failed"]
    );
}

#[test]
fn percent_of_floors_and_clamps() {
    assert_eq!(percent_of(0, 118), 0);
    assert_eq!(percent_of(59, 118), 50);
    assert_eq!(percent_of(117, 118), 99);
    assert_eq!(percent_of(200, 100), 100);
    assert_eq!(percent_of(5, 0), 0);
}
