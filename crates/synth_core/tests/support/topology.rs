use synth_core::calendar::{HourWindow, OpenDays, OpenWindow, TimeRange};
use synth_core::daytime::{DaytimeNoise, DaytimeProfile};
use synth_core::ids::LocaleId;
use synth_core::locale::{LocaleConfig, LocaleGenerator, SimpleLocaleGenerator};
use synth_core::orchestrator::GenerationOrchestrator;
use synth_core::salesperson::AvailabilityAssigner;
use synth_core::test_helpers::{constant_observations, weighted_salesperson};
use synth_core::weather::{RetryPolicy, SimpleWeatherModel, StaticWeatherSource, WeatherSource};

/// Recipient description for [`TestLocale`].
#[derive(Clone, Debug)]
pub struct TestRecipient {
    pub id: u32,
    pub hours: (u8, u8),
    pub weight: f64,
    pub products: Vec<u32>,
}

impl TestRecipient {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            hours: (0, 24),
            weight: 1.0,
            products: vec![1, 2, 3],
        }
    }

    pub fn hours(mut self, start: u8, end: u8) -> Self {
        self.hours = (start, end);
        self
    }

    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn products(mut self, products: &[u32]) -> Self {
        self.products = products.to_vec();
        self
    }

    fn build(&self) -> Box<dyn AvailabilityAssigner> {
        weighted_salesperson(self.id, self.hours.0, self.hours.1, self.weight, &self.products)
    }
}

/// Locale description with its constant weather.
#[derive(Clone, Debug)]
pub struct TestLocale {
    pub id: u32,
    pub location: String,
    pub rate: f64,
    pub open_days: OpenDays,
    pub open_hours: (u8, u8),
    pub temperature: f64,
    pub rainfall: f64,
    pub noise: Option<DaytimeNoise>,
    pub recipients: Vec<TestRecipient>,
}

impl TestLocale {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            location: format!("location-{id}"),
            rate: 50.0,
            open_days: OpenDays::all(),
            open_hours: (0, 24),
            temperature: 21.0,
            rainfall: 0.0,
            noise: None,
            recipients: vec![TestRecipient::new(id * 100)],
        }
    }

    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    pub fn open(mut self, days: OpenDays, start: u8, end: u8) -> Self {
        self.open_days = days;
        self.open_hours = (start, end);
        self
    }

    pub fn weather(mut self, temperature: f64, rainfall: f64) -> Self {
        self.temperature = temperature;
        self.rainfall = rainfall;
        self
    }

    pub fn noise(mut self, noise: DaytimeNoise) -> Self {
        self.noise = Some(noise);
        self
    }

    pub fn recipients(mut self, recipients: Vec<TestRecipient>) -> Self {
        self.recipients = recipients;
        self
    }

    pub fn build(&self) -> Box<dyn LocaleGenerator> {
        let hours = HourWindow::new(self.open_hours.0, self.open_hours.1).expect("valid open hours");
        let config = LocaleConfig::new(
            LocaleId(self.id),
            self.location.clone(),
            OpenWindow::new(self.open_days, hours),
            self.rate,
        )
        .expect("valid locale")
        .with_daytime(DaytimeProfile::default())
        .with_daytime_noise(self.noise);
        Box::new(SimpleLocaleGenerator::new(
            config,
            Box::new(SimpleWeatherModel::default()),
            self.recipients.iter().map(TestRecipient::build).collect(),
        ))
    }
}

/// Builds an orchestrator whose weather comes from an in-memory source.
#[derive(Debug, Default)]
pub struct TestTopologyBuilder {
    locales: Vec<TestLocale>,
    num_threads: Option<usize>,
}

impl TestTopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locale(mut self, locale: TestLocale) -> Self {
        self.locales.push(locale);
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }

    pub fn static_source(&self, range: &TimeRange) -> StaticWeatherSource {
        let mut source = StaticWeatherSource::new();
        for locale in &self.locales {
            source.insert(
                locale.location.clone(),
                constant_observations(range, locale.temperature, locale.rainfall),
            );
        }
        source
    }

    pub fn build(self, range: &TimeRange) -> GenerationOrchestrator {
        let source = self.static_source(range);
        self.build_with_source(Box::new(source))
    }

    pub fn build_with_source(self, source: Box<dyn WeatherSource>) -> GenerationOrchestrator {
        let locales = self.locales.iter().map(TestLocale::build).collect();
        GenerationOrchestrator::new(locales, source)
            .expect("valid test topology")
            .with_retry_policy(RetryPolicy {
                max_attempts: 2,
                initial_backoff: std::time::Duration::ZERO,
                max_backoff: std::time::Duration::ZERO,
                multiplier: 1.0,
            })
            .with_num_threads(self.num_threads)
    }
}
