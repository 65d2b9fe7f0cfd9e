use crate::app::ports::HttpClientPort;
use crate::cache::{CachedFetcher, RequestCache};
use crate::common::error::Result;
use crate::domain::CityOutcome;
use crate::pipeline::AggregatePipeline;
use crate::report::{self, DisplayRequest};
use crate::storage::{RestaurantStore, Source};
use std::io::{BufRead, Write};
use tracing::{error, info, warn};

const INTRO: &str = "Your first command must be a city name. Once data has been generated for a particular city,\n\
you can call the 'display' commands or update the city data at any time.";

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    City(String),
    Display(Vec<String>),
    Help,
    Metrics,
    Exit,
    Blank,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Blank;
    }

    let mut words = line.split_whitespace();
    let head = words.next().unwrap_or_default();
    let rest: Vec<String> = words.map(str::to_string).collect();

    match head {
        "exit" if rest.is_empty() => Command::Exit,
        "help" if rest.is_empty() => Command::Help,
        "metrics" if rest.is_empty() => Command::Metrics,
        "city" => Command::City(rest.join(" ")),
        "display" => Command::Display(rest),
        _ => Command::Unknown(line.to_string()),
    }
}

/// What the prompt does after a command. `Failed` keeps prompting; one-shot
/// callers turn it into a non-zero exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Failed,
    Exit,
}

impl Flow {
    fn from_success(ok: bool) -> Self {
        if ok {
            Flow::Continue
        } else {
            Flow::Failed
        }
    }
}

/// Interactive session over one cache, one store and (when keys are configured)
/// one pipeline.
pub struct Session {
    cache: RequestCache,
    http: Box<dyn HttpClientPort>,
    pipeline: Option<AggregatePipeline>,
    store: RestaurantStore,
    top_k: usize,
    top_categories: Vec<(String, usize)>,
    city_loaded: bool,
}

impl Session {
    /// Picks up the categories of the last stored city so `display` works straight away.
    pub fn new(
        cache: RequestCache,
        http: Box<dyn HttpClientPort>,
        pipeline: Option<AggregatePipeline>,
        store: RestaurantStore,
        top_k: usize,
    ) -> Result<Self> {
        let top_categories = store.top_categories(Source::Primary, top_k)?;
        let last_city = store.last_city()?;
        if let Some(city) = &last_city {
            info!(city = %city, "Restored stored city data");
        }
        Ok(Self {
            cache,
            http,
            pipeline,
            store,
            top_k,
            top_categories,
            city_loaded: last_city.is_some(),
        })
    }

    pub fn has_city_data(&self) -> bool {
        self.city_loaded
    }

    pub fn top_categories(&self) -> &[(String, usize)] {
        &self.top_categories
    }

    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }

    pub fn store(&self) -> &RestaurantStore {
        &self.store
    }

    /// Prompt loop until `exit` or end of input
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut output: W) -> Result<()> {
        writeln!(output, "{}", INTRO)?;
        loop {
            write!(output, "Enter a command: ")?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                break;
            }
            if self.handle_line(&line, &mut input, &mut output)? == Flow::Exit {
                break;
            }
            writeln!(output)?;
        }
        Ok(())
    }

    /// Execute one command. Only failures writing to `output` are returned as
    /// errors; command failures are reported to the user and yield `Flow::Failed`.
    pub fn handle_line<R: BufRead, W: Write>(
        &mut self,
        line: &str,
        input: &mut R,
        output: &mut W,
    ) -> Result<Flow> {
        let flow = match parse_command(line) {
            Command::Exit => {
                writeln!(output, "Bye!")?;
                Flow::Exit
            }
            Command::Help => {
                self.print_help(output)?;
                Flow::Continue
            }
            Command::Metrics => Flow::from_success(self.print_metrics(output)?),
            Command::Blank => Flow::Continue,
            Command::City(city) => Flow::from_success(self.load_city(&city, output)?),
            Command::Display(keywords) => {
                Flow::from_success(self.display(&keywords, input, output)?)
            }
            Command::Unknown(text) => {
                writeln!(output, "Command not recognized: {}", text)?;
                Flow::Failed
            }
        };
        Ok(flow)
    }

    fn print_help<W: Write>(&self, output: &mut W) -> Result<()> {
        writeln!(
            output,
            "Enter 'city' followed by the name of a city or, once you've generated a city's data,\n\
             enter 'display' followed by one of the following commands (the words after display\n\
             can be in any order):"
        )?;
        for usage in DisplayRequest::usage() {
            writeln!(output, "- {}", usage)?;
        }
        writeln!(output, "Enter 'metrics' to see request and cache counters for this session.")?;
        Ok(())
    }

    fn print_metrics<W: Write>(&self, output: &mut W) -> Result<bool> {
        match crate::observability::metrics::render() {
            Some(snapshot) => {
                write!(output, "{}", snapshot)?;
                Ok(true)
            }
            None => {
                writeln!(output, "Metrics are not enabled for this session.")?;
                Ok(false)
            }
        }
    }

    fn load_city<W: Write>(&mut self, city: &str, output: &mut W) -> Result<bool> {
        if city.is_empty() {
            writeln!(output, "Usage: city <name>")?;
            return Ok(false);
        }
        let Some(pipeline) = &self.pipeline else {
            writeln!(
                output,
                "API keys are not configured; set YELP_API_KEY and GOOGLE_PLACES_KEY to fetch city data."
            )?;
            return Ok(false);
        };

        let outcome = {
            let mut fetcher = CachedFetcher::new(&mut self.cache, self.http.as_ref());
            pipeline.run_for_city(&mut fetcher, city)
        };

        let data = match outcome {
            Ok(CityOutcome::Collected(data)) => data,
            Ok(CityOutcome::NoData) => {
                writeln!(output, "No data was found for this city. Please try again.")?;
                return Ok(false);
            }
            Err(e) => {
                error!(city, "City processing failed: {}", e);
                writeln!(output, "Could not retrieve data for {}: {}", city, e)?;
                return Ok(false);
            }
        };

        if let Err(e) = self.store.replace_city_data(&data) {
            error!(city, "Storing city data failed: {}", e);
            writeln!(output, "Could not store data for {}: {}", city, e)?;
            return Ok(false);
        }

        self.top_categories = data.primary_tally.most_common(self.top_k);
        self.city_loaded = true;
        writeln!(
            output,
            "City data generated: {} restaurants, {} matched across both sources.",
            data.primary.len(),
            data.matched_count()
        )?;
        Ok(true)
    }

    fn display<R: BufRead, W: Write>(
        &mut self,
        keywords: &[String],
        input: &mut R,
        output: &mut W,
    ) -> Result<bool> {
        if !self.has_city_data() {
            writeln!(
                output,
                "Error: You must generate data for a city before calling the display commands."
            )?;
            return Ok(false);
        }

        let Some(request) = DisplayRequest::from_keywords(keywords) else {
            writeln!(output, "Command not recognized: {}", keywords.join(","))?;
            return Ok(false);
        };

        let rendered = match request {
            DisplayRequest::CategoryRatingsScatter => self
                .store
                .category_rating_summary(&self.top_categories)
                .map(|rows| report::render_category_ratings(&rows)),
            DisplayRequest::CategoryRatingsPie => self
                .store
                .category_rating_summary(&self.top_categories)
                .map(|rows| report::render_category_rating_shares(&rows)),
            DisplayRequest::CategoryProportionsPie => {
                Ok(report::render_category_proportions(&self.top_categories))
            }
            DisplayRequest::RestaurantRatingsScatter => {
                write!(output, "{}", report::render_category_menu(&self.top_categories))?;
                write!(output, "Enter a category's number: ")?;
                output.flush()?;

                let mut answer = String::new();
                input.read_line(&mut answer)?;
                let chosen = answer
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| self.top_categories.get(i));
                let Some((category, _)) = chosen else {
                    warn!(answer = %answer.trim(), "Invalid category selection");
                    writeln!(output, "Invalid category number: {}", answer.trim())?;
                    return Ok(false);
                };
                self.store
                    .restaurant_ratings(category)
                    .map(|rows| report::render_restaurant_ratings(category, &rows))
            }
        };

        match rendered {
            Ok(text) => {
                write!(output, "{}", text)?;
                Ok(true)
            }
            Err(e) => {
                error!("Report query failed: {}", e);
                writeln!(output, "Could not build the report: {}", e)?;
                Ok(false)
            }
        }
    }
}
