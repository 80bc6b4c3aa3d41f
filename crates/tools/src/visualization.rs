use std::fmt;

use formats::LoadError;
use foundation::{EntityKey, Period};
use layers::bars::{Bar, rollup_sum};
use layers::interaction::{DetailPanel, EntityTimeline, Tooltip, tooltip};
use layers::symbology::{ColorScale, LegendEntry, ScaleError};
use layers::wordcloud::{KeywordSeries, Word, words_at};
use layers::{Layer, MapLayer, RenderContext, RenderUpdate, TransitionPlan};
use runtime::{Playback, PlaybackEvent, TickOutcome};
use scene::{AliasTable, EntitySet, MatchOutcome, NameMatcher, Observation, SeriesStore, TimeIndex};

use crate::config::{ConfigError, TimeAxis, VizConfig};
use crate::loader::Dataset;

#[derive(Debug)]
pub enum VizError {
    Config(ConfigError),
    Load(LoadError),
    Scale(ScaleError),
    EmptyTimeline,
}

impl fmt::Display for VizError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VizError::Config(e) => write!(f, "{e}"),
            VizError::Load(e) => write!(f, "load failed: {e}"),
            VizError::Scale(e) => write!(f, "{e}"),
            VizError::EmptyTimeline => write!(f, "no periods to display"),
        }
    }
}

impl std::error::Error for VizError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VizError::Config(e) => Some(e),
            VizError::Load(e) => Some(e),
            VizError::Scale(e) => Some(e),
            VizError::EmptyTimeline => None,
        }
    }
}

impl From<ConfigError> for VizError {
    fn from(e: ConfigError) -> Self {
        VizError::Config(e)
    }
}

impl From<LoadError> for VizError {
    fn from(e: LoadError) -> Self {
        VizError::Load(e)
    }
}

impl From<ScaleError> for VizError {
    fn from(e: ScaleError) -> Self {
        VizError::Scale(e)
    }
}

fn matcher_for(config: &VizConfig, geometry: &[String]) -> NameMatcher {
    let mut aliases = if config.names.world_aliases {
        AliasTable::world_countries()
    } else {
        AliasTable::new()
    };
    for (data, shape) in &config.names.aliases {
        aliases.insert(data.as_str(), shape.as_str());
    }
    let mut matcher = NameMatcher::new(geometry.iter().cloned(), aliases);
    for (from, to) in &config.names.suffix_rules {
        matcher = matcher.with_suffix_rule(from.as_str(), to.as_str());
    }
    matcher
}

/// Rewrites data keys into geometry names. Returns how many distinct data
/// names found no shape.
fn rekey(observations: Vec<Observation>, matcher: &NameMatcher) -> (Vec<Observation>, usize) {
    let mut unmatched = std::collections::BTreeSet::new();
    let out = observations
        .into_iter()
        .map(|mut o| {
            match matcher.resolve(o.key.as_str()) {
                MatchOutcome::Unmatched(name) => {
                    unmatched.insert(name);
                }
                outcome => o.key = EntityKey::from(outcome.name()),
            }
            o
        })
        .collect();
    for name in &unmatched {
        tracing::debug!("no shape for data name {name:?}");
    }
    (out, unmatched.len())
}

/// A loaded, indexed, animatable map. Owns all mutable display state; the
/// timer only ever asks it to advance.
pub struct Visualization {
    config: VizConfig,
    store: SeriesStore,
    index: TimeIndex,
    entities: EntitySet,
    matcher: NameMatcher,
    layer: MapLayer,
    playback: Playback,
    displayed: Option<layers::RenderState>,
    panel: DetailPanel,
    keywords: Vec<KeywordSeries>,
    keyword_periods: Vec<Option<Period>>,
    unmatched_names: usize,
    missed_lookups: usize,
}

impl Visualization {
    pub fn new(config: VizConfig, dataset: Dataset) -> Result<Self, VizError> {
        let matcher = matcher_for(&config, &dataset.geometry);
        let (observations, unmatched_names) = if dataset.geometry.is_empty() {
            (dataset.observations, 0)
        } else {
            rekey(dataset.observations, &matcher)
        };
        if unmatched_names > 0 {
            tracing::warn!(unmatched_names, "data names without a matching shape");
        }

        let store = SeriesStore::from_observations(observations);
        let index = match config.time {
            TimeAxis::Data => TimeIndex::from_store(&store),
            TimeAxis::Years { start, end } => TimeIndex::years(start, end)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?,
        };
        if index.is_empty() {
            return Err(VizError::EmptyTimeline);
        }

        let layer = MapLayer::build(1, &config.layer, &store)?;
        let entities = EntitySet::from_keys(dataset.geometry.iter().map(String::as_str));

        let (keywords, keyword_periods) = match &dataset.trends {
            Some(doc) => {
                let series = doc
                    .keywords
                    .iter()
                    .map(|(word, values)| KeywordSeries {
                        text: word.clone(),
                        values: values.clone(),
                        average: doc.average(word).unwrap_or(0.0),
                        flagged: doc.is_flagged(word),
                    })
                    .collect();
                (series, doc.periods(None))
            }
            None => (Vec::new(), Vec::new()),
        };

        let mut playback = Playback::new(index.len());
        if let Some(start) = config.playback.start_period {
            if let Some(i) = index.floor_index(start) {
                playback.seek(i);
            }
        }

        tracing::info!(
            periods = index.len(),
            entities = store.entity_count(),
            records = store.record_count(),
            dropped_non_finite = store.dropped_non_finite(),
            "visualization ready"
        );

        Ok(Self {
            config,
            store,
            index,
            entities,
            matcher,
            layer,
            playback,
            displayed: None,
            panel: DetailPanel::default(),
            keywords,
            keyword_periods,
            unmatched_names,
            missed_lookups: 0,
        })
    }

    pub fn config(&self) -> &VizConfig {
        &self.config
    }

    pub fn store(&self) -> &SeriesStore {
        &self.store
    }

    pub fn index(&self) -> &TimeIndex {
        &self.index
    }

    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    pub fn displayed(&self) -> Option<&layers::RenderState> {
        self.displayed.as_ref()
    }

    pub fn unmatched_names(&self) -> usize {
        self.unmatched_names
    }

    /// Hovers and clicks that resolved to no shape.
    pub fn missed_lookups(&self) -> usize {
        self.missed_lookups
    }

    pub fn current_period(&self) -> Option<Period> {
        self.index.get(self.playback.cursor())
    }

    /// Draws the period at the playback cursor and makes it the displayed
    /// frame.
    pub fn render(&mut self) -> Option<RenderUpdate> {
        let period = self.current_period()?;
        let ctx = RenderContext {
            store: &self.store,
            entities: &self.entities,
        };
        let state = self.layer.extract(&ctx, period);
        let changes = state.reconcile(self.displayed.as_ref());
        let transition = TransitionPlan::plan(&self.layer.transition(), &changes);
        self.displayed = Some(state.clone());
        Some(RenderUpdate {
            state,
            changes,
            transition,
        })
    }

    /// Moves the cursor to the last period at or before `period`.
    pub fn seek_period(&mut self, period: Period) -> Option<PlaybackEvent> {
        let i = self.index.floor_index(period)?;
        self.playback.seek(i)
    }

    pub fn seek(&mut self, index: usize) -> Option<PlaybackEvent> {
        self.playback.seek(index)
    }

    pub fn start(&mut self) -> Option<PlaybackEvent> {
        self.playback.start()
    }

    pub fn stop(&mut self) -> Option<PlaybackEvent> {
        self.playback.stop()
    }

    pub fn tick(&mut self) -> TickOutcome {
        self.playback.tick()
    }

    /// Store key for a displayed name. Keys are only rewritten onto shape
    /// names when shapes were loaded; otherwise the data spelling is kept.
    fn key_for(&self, name: &str) -> (EntityKey, bool) {
        if self.entities.is_empty() {
            let key = EntityKey::from(name.trim());
            let found = self.store.contains(key.as_str());
            return (key, found);
        }
        let outcome = self.matcher.resolve(name);
        (EntityKey::from(outcome.name()), outcome.is_matched())
    }

    fn resolve(&mut self, name: &str) -> EntityKey {
        let (key, matched) = self.key_for(name);
        if !matched && !self.store.contains(key.as_str()) {
            self.missed_lookups += 1;
            tracing::debug!(name, "lookup matched no entity");
        }
        key
    }

    /// Tooltip for a hovered shape, read from the displayed frame.
    pub fn hover(&mut self, name: &str, pointer: [f64; 2]) -> Option<Tooltip> {
        let key = self.resolve(name);
        let state = self.displayed.as_ref()?;
        Some(tooltip(
            state,
            key.as_str(),
            name.trim(),
            pointer,
            &self.config.tooltip,
        ))
    }

    /// Toggles the detail panel. Returns the timeline when the panel is
    /// open afterwards and the entity has data.
    pub fn click(&mut self, name: &str) -> Option<EntityTimeline> {
        let key = self.resolve(name);
        if !self.panel.toggle(key.as_str()) {
            return None;
        }
        self.timeline(key.as_str())
    }

    pub fn timeline(&self, name: &str) -> Option<EntityTimeline> {
        let (key, _) = self.key_for(name);
        let current = self.current_period()?;
        EntityTimeline::build(&self.store, &self.index, key.as_str(), current, &self.config.timeline)
    }

    pub fn legend(&self) -> Option<Vec<LegendEntry>> {
        match &self.layer {
            MapLayer::Choropleth(layer) => match layer.scale() {
                ColorScale::Threshold(scale) => Some(scale.legend(0.0, &self.config.legend_unit)),
                ColorScale::Sequential(_) => None,
            },
            MapLayer::Bubbles(_) => None,
        }
    }

    /// Keyword sizes for the current period, if the dataset has keywords.
    pub fn words(&self) -> Option<Vec<Word>> {
        let config = self.config.wordcloud.as_ref()?;
        if self.keywords.is_empty() {
            return None;
        }
        let current = self.current_period()?;
        let i = self
            .keyword_periods
            .iter()
            .rposition(|p| p.is_some_and(|p| p <= current))?;
        Some(words_at(&self.keywords, &self.keyword_periods, i, config))
    }

    /// Displayed values summed per category, where `category` maps an
    /// entity key to its group.
    pub fn rollup(&self, category: impl Fn(&EntityKey) -> Option<String>) -> Vec<Bar> {
        let Some(state) = &self.displayed else {
            return Vec::new();
        };
        rollup_sum(
            state
                .marks
                .values()
                .filter_map(|m| Some((category(&m.key)?, m.value?))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{VizError, Visualization};
    use crate::config::{TimeAxis, VizConfig};
    use crate::loader::Dataset;
    use foundation::{EntityKey, Period};
    use layers::LayerConfig;
    use layers::bubbles::BubbleConfig;
    use pretty_assertions::assert_eq;
    use runtime::{PlaybackEvent, TickOutcome};
    use scene::Observation;
    use std::path::Path;

    fn p(s: &str) -> Period {
        Period::parse(s).unwrap()
    }

    fn config(extra: &str) -> VizConfig {
        let json = format!(
            r#"{{"sources": [{{"kind": "wide_csv", "path": "u.csv", "key_column": "name"}}]{extra}}}"#
        );
        VizConfig::from_slice(Path::new("viz.json"), json.as_bytes()).unwrap()
    }

    fn countries() -> Dataset {
        Dataset {
            observations: vec![
                Observation::new(p("2000"), "Egypt, Arab Rep.", 9.0),
                Observation::new(p("2001"), "Egypt, Arab Rep.", 9.3),
                Observation::new(p("2000"), "France", 8.5),
                Observation::new(p("2002"), "France", 8.3),
                Observation::new(p("2001"), "Atlantis", 1.0),
            ],
            geometry: vec!["Egypt".into(), "France".into(), "Peru".into()],
            ..Dataset::default()
        }
    }

    #[test]
    fn data_names_are_rekeyed_onto_shapes() {
        let viz = Visualization::new(
            config(r#", "names": {"world_aliases": true}"#),
            countries(),
        )
        .unwrap();
        assert!(viz.store().contains("Egypt"));
        assert!(!viz.store().contains("Egypt, Arab Rep."));
        assert_eq!(viz.unmatched_names(), 1);
    }

    #[test]
    fn render_uses_latest_as_of_and_reconciles() {
        let mut viz = Visualization::new(
            config(r#", "names": {"world_aliases": true}, "time": {"kind": "years", "start": 2000, "end": 2003}"#),
            countries(),
        )
        .unwrap();
        assert_eq!(viz.index().len(), 4);

        let first = viz.render().unwrap();
        assert_eq!(first.state.period, p("2000"));
        assert_eq!(first.changes.entered.len(), 3);
        assert_eq!(first.state.value("Peru"), None);

        viz.seek(3);
        let last = viz.render().unwrap();
        assert_eq!(last.state.value("Egypt"), Some(9.3));
        assert_eq!(last.state.value("France"), Some(8.3));
        assert!(last.changes.entered.is_empty());
        assert_eq!(last.changes.updated.len(), 2);
    }

    #[test]
    fn hover_reads_displayed_frame_through_aliases() {
        let mut viz = Visualization::new(
            config(r#", "names": {"world_aliases": true}, "tooltip": {"template": "{period}: {value}%", "precision": 1}"#),
            countries(),
        )
        .unwrap();
        assert!(viz.hover("Egypt", [0.0, 0.0]).is_none());

        viz.render();
        let tip = viz.hover("Egypt, Arab Rep.", [50.0, 50.0]).unwrap();
        assert_eq!(tip.body, "2000: 9.0%");
        assert_eq!((tip.x, tip.y), (60.0, 22.0));

        let tip = viz.hover("Peru", [0.0, 0.0]).unwrap();
        assert_eq!(tip.body, "No data available");

        viz.hover("Narnia", [0.0, 0.0]);
        assert_eq!(viz.missed_lookups(), 1);
    }

    #[test]
    fn click_toggles_detail_timeline() {
        let mut viz = Visualization::new(
            config(r#", "names": {"world_aliases": true}"#),
            countries(),
        )
        .unwrap();
        let t = viz.click("Egypt, Arab Rep.").unwrap();
        assert_eq!(t.key, EntityKey::from("Egypt"));
        assert_eq!(t.points.len(), 2);
        assert!(viz.click("Egypt").is_none());
        assert!(viz.click("Peru").is_none());
    }

    #[test]
    fn playback_drives_render() {
        let mut viz = Visualization::new(config(""), countries()).unwrap();
        let n = viz.index().len();
        assert_eq!(viz.start(), Some(PlaybackEvent::Started { from: 0 }));
        let mut seen = vec![viz.render().unwrap().state.period];
        loop {
            match viz.tick() {
                TickOutcome::Advanced(_) => seen.push(viz.render().unwrap().state.period),
                TickOutcome::Finished(_) => {
                    seen.push(viz.render().unwrap().state.period);
                    break;
                }
                TickOutcome::Idle => panic!("stopped early"),
            }
        }
        assert_eq!(seen.len(), n);
        assert_eq!(seen, viz.index().periods().to_vec());
        assert!(!viz.playback().is_playing());
    }

    #[test]
    fn start_period_positions_cursor() {
        let viz = Visualization::new(
            config(r#", "playback": {"start_period": "2001-06"}"#),
            countries(),
        )
        .unwrap();
        assert_eq!(viz.current_period(), Some(p("2001")));
    }

    #[test]
    fn bubbles_without_geometry_keep_raw_keys() {
        let mut cfg = config("");
        cfg.layer = LayerConfig::Bubbles(BubbleConfig::default());
        let key = EntityKey::from_lat_lon(40.71, -74.0);
        let dataset = Dataset {
            observations: vec![
                Observation::new(p("2008-09"), key.clone(), 100.0),
                Observation::new(p("2008-10"), key.clone(), 400.0),
            ],
            ..Dataset::default()
        };
        let mut viz = Visualization::new(cfg, dataset).unwrap();
        viz.seek(1);
        let frame = viz.render().unwrap();
        assert_eq!(frame.state.mark(key.as_str()).unwrap().radius, Some(40.0));
        assert_eq!(frame.state.total(), 400.0);
    }

    #[test]
    fn hover_and_click_without_geometry_use_data_spelling() {
        let dataset = Dataset {
            observations: vec![Observation::new(p("2000"), "Egypt, Arab Rep.", 9.0)],
            ..Dataset::default()
        };
        let mut viz =
            Visualization::new(config(r#", "names": {"world_aliases": true}"#), dataset).unwrap();
        let frame = viz.render().unwrap();
        assert_eq!(frame.state.value("Egypt, Arab Rep."), Some(9.0));

        let tip = viz.hover("Egypt, Arab Rep.", [0.0, 0.0]).unwrap();
        assert_eq!(tip.body, "9.00");
        assert_eq!(viz.missed_lookups(), 0);

        let t = viz.click("Egypt, Arab Rep.").unwrap();
        assert_eq!(t.key, EntityKey::from("Egypt, Arab Rep."));
        assert_eq!(t.points.len(), 1);

        viz.hover("Egypt", [0.0, 0.0]);
        assert_eq!(viz.missed_lookups(), 1);
    }

    #[test]
    fn rollup_groups_displayed_values() {
        let mut viz = Visualization::new(
            config(r#", "names": {"world_aliases": true}"#),
            countries(),
        )
        .unwrap();
        viz.render();
        let bars = viz.rollup(|k| {
            Some(if k.as_str() == "Egypt" { "Africa" } else { "Europe" }.to_string())
        });
        assert_eq!(bars[0].category, "Africa");
        assert_eq!(bars[0].total, 9.0);
    }

    #[test]
    fn empty_dataset_has_no_timeline() {
        let err = Visualization::new(config(""), Dataset::default()).err().unwrap();
        assert!(matches!(err, VizError::EmptyTimeline));
        let mut cfg = config("");
        cfg.time = TimeAxis::Years {
            start: 2000,
            end: 2001,
        };
        assert!(Visualization::new(cfg, Dataset::default()).is_ok());
    }

    fn demo(name: &str) -> std::path::PathBuf {
        std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("assets/demo")
            .join(name)
    }

    async fn open_demo(name: &str) -> Visualization {
        let config = VizConfig::load(&demo(name)).unwrap();
        let dataset = crate::loader::load_dataset(&config).await.unwrap();
        Visualization::new(config, dataset).unwrap()
    }

    #[tokio::test]
    async fn demo_unemployment_end_to_end() {
        let mut viz = open_demo("unemployment.json").await;
        assert_eq!(viz.index().len(), 6);
        assert_eq!(viz.unmatched_names(), 1);

        viz.seek_period(p("2021"));
        let frame = viz.render().unwrap();
        assert_eq!(frame.state.len(), 7);
        assert_eq!(frame.state.value("Egypt"), Some(7.4));
        assert_eq!(frame.state.value("Russia"), Some(4.7));
        assert_eq!(frame.state.value("Dominican Rep."), Some(7.4));
        // Exact lookups: Chad has no 2021 value and Peru no data at all.
        assert_eq!(frame.state.value("Chad"), None);
        assert_eq!(frame.state.value("Peru"), None);

        let tip = viz.hover("Spain", [0.0, 0.0]).unwrap();
        assert_eq!(tip.body, "Unemployment Rate (2021): 14.80%");

        let timeline = viz.click("Spain").unwrap();
        assert_eq!(timeline.points.len(), 5);
        assert_eq!(timeline.y_domain, [0.0, 15.5]);

        // The trailing year has no data anywhere.
        viz.seek_period(p("2024"));
        assert_eq!(viz.render().unwrap().state.with_data(), 0);
    }

    #[tokio::test]
    async fn demo_banks_accumulate_bubbles() {
        let mut viz = open_demo("banks.json").await;
        let periods: Vec<String> = viz.index().iter().map(|p| p.to_string()).collect();
        assert_eq!(
            periods,
            vec!["2008-03", "2008-07", "2008-09", "2008-11", "2009-05"]
        );

        viz.seek_period(p("2008-10"));
        let frame = viz.render().unwrap();
        assert_eq!(frame.state.len(), 3);
        assert_eq!(frame.state.total(), 1_034_000.0 + 32_000.0 + 307_000.0);
        let lehman = frame.state.mark("40.71|-74.01").unwrap();
        assert_eq!(lehman.radius, Some(40.0));

        viz.seek_period(p("2009-05"));
        let later = viz.render().unwrap();
        assert_eq!(later.changes.entered.len(), 2);
        assert!(later.changes.exited.is_empty());
        assert_eq!(later.transition.exit_delay_ms, 750);
    }

    #[tokio::test]
    async fn demo_delinquency_thresholds() {
        let mut viz = open_demo("delinquency_map.json").await;
        viz.seek_period(p("2008-03"));
        let frame = viz.render().unwrap();
        let fill = |k: &str| frame.state.mark(k).unwrap().fill.to_hex();
        assert_eq!(fill("Nevada"), "#0d1b2a");
        assert_eq!(fill("Ohio"), "#7fa1c1");
        // Iowa's March value is null; the January one carries forward.
        assert_eq!(fill("Iowa"), "#e0e7f4");
        assert_eq!(fill("Utah"), "#eeeeee");

        let labels: Vec<String> = viz.legend().unwrap().into_iter().map(|e| e.label).collect();
        assert_eq!(labels.first().map(String::as_str), Some("0-1%"));
        assert_eq!(labels.last().map(String::as_str), Some("5%+"));
    }

    #[test]
    fn keyword_sizes_follow_current_period() {
        let doc = formats::TrendsDocument::from_slice(
            br#"{
                "dates": ["2008-08-03", "2008-09-07", "2008-10-05"],
                "keywords": {"recession": [10, 40, 80], "weather": [50, 50, 50]},
                "averages": {"recession": 20.0, "weather": 50.0},
                "is_crisis_related": {"recession": 1}
            }"#,
        )
        .unwrap();
        let (observations, _) = doc.observations(None);
        let dataset = Dataset {
            observations,
            trends: Some(doc),
            ..Dataset::default()
        };
        let mut viz = Visualization::new(
            config(r#", "wordcloud": {"boost_span": {"start": "2008-09", "end": "2009-06"}}"#),
            dataset,
        )
        .unwrap();

        let words = viz.words().unwrap();
        assert_eq!(words[0].text, "recession");
        assert_eq!(words[0].size, 12.0);

        viz.seek_period(p("2008-10"));
        let words = viz.words().unwrap();
        assert_eq!(words[0].size, 24.0);
        assert!(words[0].highlighted);
        assert_eq!(words[1].size, 60.0);
    }
}
