//! Normalisation between the country aggregate and its relational rows.
//!
//! [`flatten`] turns aggregates into a [`TableSet`]: one row per country,
//! keyed child rows for the string sets and translations, one row per shared
//! entity (deduplicated by natural key, last write wins) and join rows linking
//! countries to shared entities. [`rebuild`] reverses the mapping in three
//! passes: shared lookups, per-owner grouping of child rows, then assembly.
//!
//! A join row whose target is missing from the shared tables resolves to a
//! `None` member instead of failing the rebuild. The store enforces no
//! referential integrity, so dangling links are an expected state.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::warn;

use crate::{Country, Currency, Language, LatLng, RegionalBloc, Translations};

/// The unordered string collections carried by a country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StringSet {
    /// Internet top-level domains.
    TopLevelDomains,
    /// International dialling codes.
    CallingCodes,
    /// Alternative spellings.
    AltSpellings,
    /// UTC offsets.
    Timezones,
    /// Neighbouring alpha-3 codes.
    Borders,
}

impl StringSet {
    /// Every string set, in schema order.
    pub const ALL: [Self; 5] = [
        Self::TopLevelDomains,
        Self::CallingCodes,
        Self::AltSpellings,
        Self::Timezones,
        Self::Borders,
    ];

    /// Name of the table holding this set.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::TopLevelDomains => "country_top_level_domains",
            Self::CallingCodes => "country_calling_codes",
            Self::AltSpellings => "country_alt_spellings",
            Self::Timezones => "country_timezones",
            Self::Borders => "country_borders",
        }
    }

    /// Borrow this set from a country.
    #[must_use]
    pub const fn values(self, country: &Country) -> &BTreeSet<String> {
        match self {
            Self::TopLevelDomains => &country.top_level_domains,
            Self::CallingCodes => &country.calling_codes,
            Self::AltSpellings => &country.alt_spellings,
            Self::Timezones => &country.timezones,
            Self::Borders => &country.borders,
        }
    }

    const fn values_mut(self, country: &mut Country) -> &mut BTreeSet<String> {
        match self {
            Self::TopLevelDomains => &mut country.top_level_domains,
            Self::CallingCodes => &mut country.calling_codes,
            Self::AltSpellings => &mut country.alt_spellings,
            Self::Timezones => &mut country.timezones,
            Self::Borders => &mut country.borders,
        }
    }
}

/// Scalar columns of the `countries` table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CountryRow {
    pub alpha3_code: String,
    pub name: Option<String>,
    pub native_name: Option<String>,
    pub alpha2_code: Option<String>,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub subregion: Option<String>,
    pub population: u64,
    pub demonym: Option<String>,
    pub area: f64,
    pub gini: f64,
    pub numeric_code: Option<String>,
    pub flag: Option<String>,
    pub cioc: Option<String>,
    /// Latitude; set together with [`Self::lng`] or not at all.
    pub lat: Option<f64>,
    /// Longitude; set together with [`Self::lat`] or not at all.
    pub lng: Option<f64>,
}

impl CountryRow {
    fn from_country(country: &Country) -> Self {
        Self {
            alpha3_code: country.alpha3_code.clone(),
            name: country.name.clone(),
            native_name: country.native_name.clone(),
            alpha2_code: country.alpha2_code.clone(),
            capital: country.capital.clone(),
            region: country.region.clone(),
            subregion: country.subregion.clone(),
            population: country.population,
            demonym: country.demonym.clone(),
            area: country.area,
            gini: country.gini,
            numeric_code: country.numeric_code.clone(),
            flag: country.flag.clone(),
            cioc: country.cioc.clone(),
            lat: country.lat_lng.map(|point| point.lat),
            lng: country.lat_lng.map(|point| point.lng),
        }
    }

    fn to_country(&self) -> Country {
        let lat_lng = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(LatLng { lat, lng }),
            _ => None,
        };
        Country {
            alpha3_code: self.alpha3_code.clone(),
            name: self.name.clone(),
            native_name: self.native_name.clone(),
            alpha2_code: self.alpha2_code.clone(),
            capital: self.capital.clone(),
            region: self.region.clone(),
            subregion: self.subregion.clone(),
            population: self.population,
            demonym: self.demonym.clone(),
            area: self.area,
            gini: self.gini,
            numeric_code: self.numeric_code.clone(),
            flag: self.flag.clone(),
            cioc: self.cioc.clone(),
            lat_lng,
            ..Country::default()
        }
    }
}

/// Every row a single country contributes to the schema.
///
/// Shared entities are listed once per natural key; the join rows are the
/// keys of those entities.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CountryRows {
    /// Scalar row.
    pub country: CountryRow,
    /// `(set, value)` child rows.
    pub strings: BTreeSet<(StringSet, String)>,
    /// Translation row, when the country carried translations.
    pub translations: Option<Translations>,
    /// Currency upserts, one per code.
    pub currencies: Vec<Currency>,
    /// Language upserts, one per ISO 639-2 code.
    pub languages: Vec<Language>,
    /// Regional bloc upserts, one per acronym.
    pub regional_blocs: Vec<RegionalBloc>,
}

impl CountryRows {
    /// Owner key for every row.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.country.alpha3_code
    }
}

/// In-memory image of the whole normalised schema.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableSet {
    /// `countries`, keyed by alpha-3 code.
    pub countries: BTreeMap<String, CountryRow>,
    /// String-set child rows as `(owner, set, value)`.
    pub strings: BTreeSet<(String, StringSet, String)>,
    /// `translations`, keyed by owner.
    pub translations: BTreeMap<String, Translations>,
    /// Shared `currencies`, keyed by code.
    pub currencies: BTreeMap<String, Currency>,
    /// Shared `languages`, keyed by ISO 639-2 code.
    pub languages: BTreeMap<String, Language>,
    /// Shared `regional_blocs`, keyed by acronym.
    pub regional_blocs: BTreeMap<String, RegionalBloc>,
    /// Join rows `(owner, currency code)`.
    pub country_currencies: BTreeSet<(String, String)>,
    /// Join rows `(owner, ISO 639-2 code)`.
    pub country_languages: BTreeSet<(String, String)>,
    /// Join rows `(owner, bloc acronym)`.
    pub country_regional_blocs: BTreeSet<(String, String)>,
}

impl TableSet {
    /// Apply one country's rows with insert-or-replace semantics.
    ///
    /// The country's previous child and join rows are dropped first. Shared
    /// entities are overwritten in place and never removed.
    pub fn upsert(&mut self, rows: CountryRows) {
        let key = rows.key().to_owned();
        self.remove_children(&key);

        for (set, value) in rows.strings {
            self.strings.insert((key.clone(), set, value));
        }
        if let Some(translations) = rows.translations {
            self.translations.insert(key.clone(), translations);
        }
        for currency in rows.currencies {
            self.country_currencies
                .insert((key.clone(), currency.code.clone()));
            self.currencies.insert(currency.code.clone(), currency);
        }
        for language in rows.languages {
            self.country_languages
                .insert((key.clone(), language.iso639_2.clone()));
            self.languages.insert(language.iso639_2.clone(), language);
        }
        for bloc in rows.regional_blocs {
            self.country_regional_blocs
                .insert((key.clone(), bloc.acronym.clone()));
            self.regional_blocs.insert(bloc.acronym.clone(), bloc);
        }
        self.countries.insert(key, rows.country);
    }

    fn remove_children(&mut self, key: &str) {
        self.strings.retain(|(owner, _, _)| owner != key);
        self.translations.remove(key);
        self.country_currencies.retain(|(owner, _)| owner != key);
        self.country_languages.retain(|(owner, _)| owner != key);
        self.country_regional_blocs.retain(|(owner, _)| owner != key);
    }
}

/// Flatten a list of aggregates into a fresh [`TableSet`].
///
/// Later countries win when two of them carry different attributes for the
/// same shared key.
///
/// # Examples
///
/// ```
/// use paises_core::{Country, Currency, flatten, rebuild};
///
/// let euro = |name: &str| Some(Currency { code: "EUR".into(), name: Some(name.into()), symbol: None });
/// let countries = vec![
///     Country { alpha3_code: "PRT".into(), currencies: vec![euro("Euro")], ..Country::default() },
///     Country { alpha3_code: "ESP".into(), currencies: vec![euro("euro")], ..Country::default() },
/// ];
///
/// let tables = flatten(&countries);
/// assert_eq!(tables.currencies.len(), 1);
/// for country in rebuild(&tables) {
///     assert_eq!(country.currencies, vec![euro("euro")]);
/// }
/// ```
#[must_use]
pub fn flatten(countries: &[Country]) -> TableSet {
    let mut tables = TableSet::default();
    for country in countries {
        tables.upsert(flatten_country(country));
    }
    tables
}

/// Produce the rows a single country contributes.
///
/// Members without a natural key cannot be linked and are dropped with a
/// warning. Duplicate members collapse to one row per key.
#[must_use]
pub fn flatten_country(country: &Country) -> CountryRows {
    let key = country.alpha3_code.as_str();
    let strings = StringSet::ALL
        .into_iter()
        .flat_map(|set| {
            set.values(country)
                .iter()
                .map(move |value| (set, value.clone()))
        })
        .collect();

    CountryRows {
        country: CountryRow::from_country(country),
        strings,
        translations: country.translations.clone(),
        currencies: keyed_members(key, "currency", &country.currencies, |c| &c.code),
        languages: keyed_members(key, "language", &country.languages, |l| &l.iso639_2),
        regional_blocs: keyed_members(key, "regional bloc", &country.regional_blocs, |b| {
            &b.acronym
        }),
    }
}

fn keyed_members<T: Clone>(
    owner: &str,
    kind: &str,
    members: &[Option<T>],
    natural_key: impl Fn(&T) -> &String,
) -> Vec<T> {
    let mut by_key = BTreeMap::new();
    for member in members.iter().flatten() {
        let key = natural_key(member);
        if key.trim().is_empty() {
            warn!("dropping {kind} without a key from country {owner}");
            continue;
        }
        by_key.insert(key.clone(), member.clone());
    }
    by_key.into_values().collect()
}

/// Reassemble aggregates from a [`TableSet`], ordered by alpha-3 code.
#[must_use]
pub fn rebuild(tables: &TableSet) -> Vec<Country> {
    // Pass 1: the shared tables are already keyed lookups.
    let currencies = &tables.currencies;
    let languages = &tables.languages;
    let regional_blocs = &tables.regional_blocs;

    // Pass 2: group child and join rows by owner.
    let mut strings: HashMap<&str, Vec<(StringSet, &str)>> = HashMap::new();
    for (owner, set, value) in &tables.strings {
        strings
            .entry(owner.as_str())
            .or_default()
            .push((*set, value.as_str()));
    }
    let currency_links = group_links(&tables.country_currencies);
    let language_links = group_links(&tables.country_languages);
    let bloc_links = group_links(&tables.country_regional_blocs);

    // Pass 3: assemble each country.
    tables
        .countries
        .values()
        .map(|row| {
            let key = row.alpha3_code.as_str();
            let mut country = row.to_country();
            for (set, value) in strings.get(key).into_iter().flatten() {
                set.values_mut(&mut country).insert((*value).to_owned());
            }
            country.currencies = resolve(currency_links.get(key), currencies);
            country.languages = resolve(language_links.get(key), languages);
            country.regional_blocs = resolve(bloc_links.get(key), regional_blocs);
            country.translations = tables.translations.get(key).cloned();
            country
        })
        .collect()
}

fn group_links(links: &BTreeSet<(String, String)>) -> HashMap<&str, Vec<&str>> {
    let mut grouped: HashMap<&str, Vec<&str>> = HashMap::new();
    for (owner, member) in links {
        grouped
            .entry(owner.as_str())
            .or_default()
            .push(member.as_str());
    }
    grouped
}

fn resolve<T: Clone>(keys: Option<&Vec<&str>>, lookup: &BTreeMap<String, T>) -> Vec<Option<T>> {
    keys.map(|members| {
        members
            .iter()
            .map(|member| lookup.get(*member).cloned())
            .collect()
    })
    .unwrap_or_default()
}
