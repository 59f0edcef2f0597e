//! The country aggregate and its nested value types.
//!
//! The field layout follows the REST Countries v2 payload so the aggregate can
//! be decoded straight from the remote list when the `serde` feature is
//! enabled. Missing and `null` values decode to their defaults rather than
//! failing the whole list.

use std::{collections::BTreeSet, fmt};

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer};

/// A country with every nested collection attached.
///
/// Countries are immutable once constructed; the mapper and the store build
/// new values instead of mutating existing ones.
///
/// # Examples
///
/// ```
/// use paises_core::Country;
///
/// let portugal = Country {
///     alpha3_code: "PRT".into(),
///     name: Some("Portugal".into()),
///     ..Country::default()
/// };
/// assert_eq!(portugal.file_stem().as_deref(), Some("prt"));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct Country {
    /// ISO 3166-1 alpha-3 code; the aggregate key.
    pub alpha3_code: String,
    /// Common English name.
    pub name: Option<String>,
    /// Name in the country's main language.
    pub native_name: Option<String>,
    /// ISO 3166-1 alpha-2 code.
    pub alpha2_code: Option<String>,
    /// Capital city.
    pub capital: Option<String>,
    /// Continental region.
    pub region: Option<String>,
    /// Sub-region within [`Self::region`].
    pub subregion: Option<String>,
    /// Resident population.
    #[cfg_attr(feature = "serde", serde(default, deserialize_with = "null_as_default"))]
    pub population: u64,
    /// Demonym for residents.
    pub demonym: Option<String>,
    /// Surface area in km²; `0.0` when unknown.
    #[cfg_attr(feature = "serde", serde(default, deserialize_with = "null_as_default"))]
    pub area: f64,
    /// Gini coefficient; `0.0` when unknown.
    #[cfg_attr(feature = "serde", serde(default, deserialize_with = "null_as_default"))]
    pub gini: f64,
    /// ISO 3166-1 numeric code.
    pub numeric_code: Option<String>,
    /// Location of the vector flag asset.
    pub flag: Option<String>,
    /// International Olympic Committee code.
    pub cioc: Option<String>,
    /// Internet top-level domains.
    #[cfg_attr(
        feature = "serde",
        serde(
            rename = "topLevelDomain",
            default,
            deserialize_with = "null_as_default"
        )
    )]
    pub top_level_domains: BTreeSet<String>,
    /// International dialling codes.
    #[cfg_attr(feature = "serde", serde(default, deserialize_with = "null_as_default"))]
    pub calling_codes: BTreeSet<String>,
    /// Alternative spellings of the name.
    #[cfg_attr(feature = "serde", serde(default, deserialize_with = "null_as_default"))]
    pub alt_spellings: BTreeSet<String>,
    /// UTC offsets in use.
    #[cfg_attr(feature = "serde", serde(default, deserialize_with = "null_as_default"))]
    pub timezones: BTreeSet<String>,
    /// Alpha-3 codes of neighbouring countries. Not reconciled against stored
    /// countries.
    #[cfg_attr(feature = "serde", serde(default, deserialize_with = "null_as_default"))]
    pub borders: BTreeSet<String>,
    /// Representative coordinate, absent when unknown.
    #[cfg_attr(
        feature = "serde",
        serde(rename = "latlng", default, with = "lat_lng_array")
    )]
    pub lat_lng: Option<LatLng>,
    /// Currencies in circulation. `None` marks a linked currency whose shared
    /// row was never stored.
    #[cfg_attr(feature = "serde", serde(default, deserialize_with = "null_as_default"))]
    pub currencies: Vec<Option<Currency>>,
    /// Official languages. `None` marks a dangling link.
    #[cfg_attr(feature = "serde", serde(default, deserialize_with = "null_as_default"))]
    pub languages: Vec<Option<Language>>,
    /// Regional trade blocs. `None` marks a dangling link.
    #[cfg_attr(feature = "serde", serde(default, deserialize_with = "null_as_default"))]
    pub regional_blocs: Vec<Option<RegionalBloc>>,
    /// Translated names, absent when the record carried none.
    pub translations: Option<Translations>,
}

impl Country {
    /// Lower-cased key used to name the record's flag assets.
    ///
    /// Returns `None` when the key is not three ASCII letters, which keeps
    /// arbitrary input out of filesystem paths.
    #[must_use]
    pub fn file_stem(&self) -> Option<String> {
        let key = self.alpha3_code.as_str();
        (key.len() == 3 && key.bytes().all(|byte| byte.is_ascii_alphabetic()))
            .then(|| key.to_ascii_lowercase())
    }

    /// Display label, falling back to the key when the name is missing.
    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.alpha3_code)
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A currency shared between countries, keyed by its ISO 4217 code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Currency {
    /// ISO 4217 code; blank when the source omitted it.
    #[cfg_attr(feature = "serde", serde(default, deserialize_with = "null_as_default"))]
    pub code: String,
    /// Currency name.
    pub name: Option<String>,
    /// Display symbol.
    pub symbol: Option<String>,
}

/// A language shared between countries, keyed by its ISO 639-2 code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct Language {
    /// ISO 639-2 code; blank when the source omitted it.
    #[cfg_attr(
        feature = "serde",
        serde(rename = "iso639_2", default, deserialize_with = "null_as_default")
    )]
    pub iso639_2: String,
    /// ISO 639-1 code.
    #[cfg_attr(feature = "serde", serde(rename = "iso639_1"))]
    pub iso639_1: Option<String>,
    /// English name.
    pub name: Option<String>,
    /// Name in the language itself.
    pub native_name: Option<String>,
}

/// A regional trade bloc shared between countries, keyed by its acronym.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct RegionalBloc {
    /// Bloc acronym; blank when the source omitted it.
    #[cfg_attr(feature = "serde", serde(default, deserialize_with = "null_as_default"))]
    pub acronym: String,
    /// Full bloc name.
    pub name: Option<String>,
    /// Alternative acronyms.
    #[cfg_attr(feature = "serde", serde(default, deserialize_with = "null_as_default"))]
    pub other_acronyms: BTreeSet<String>,
    /// Alternative names.
    #[cfg_attr(feature = "serde", serde(default, deserialize_with = "null_as_default"))]
    pub other_names: BTreeSet<String>,
}

macro_rules! display_name_or_key {
    ($ty:ty, $key:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name.as_deref().unwrap_or(&self.$key))
            }
        }
    };
}

display_name_or_key!(Currency, code);
display_name_or_key!(Language, iso639_2);
display_name_or_key!(RegionalBloc, acronym);

/// Country names in ten fixed languages. Each field is independently absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Translations {
    /// German.
    pub de: Option<String>,
    /// Spanish.
    pub es: Option<String>,
    /// French.
    pub fr: Option<String>,
    /// Japanese.
    pub ja: Option<String>,
    /// Italian.
    pub it: Option<String>,
    /// Brazilian Portuguese.
    pub br: Option<String>,
    /// Portuguese.
    pub pt: Option<String>,
    /// Dutch.
    pub nl: Option<String>,
    /// Croatian.
    pub hr: Option<String>,
    /// Persian.
    pub fa: Option<String>,
}

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
}

/// Error raised when a coordinate list is neither empty nor a pair.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LatLngError {
    /// The list held the wrong number of values.
    #[error("expected zero or two coordinates, found {len}")]
    Length {
        /// Number of values supplied.
        len: usize,
    },
}

impl LatLng {
    /// Interpret a raw coordinate list, where an empty list means "unknown".
    ///
    /// # Examples
    ///
    /// ```
    /// use paises_core::LatLng;
    ///
    /// assert_eq!(LatLng::from_coordinates(&[]), Ok(None));
    /// let lisbon = LatLng::from_coordinates(&[39.5, -8.0]).unwrap();
    /// assert_eq!(lisbon, Some(LatLng { lat: 39.5, lng: -8.0 }));
    /// assert!(LatLng::from_coordinates(&[1.0]).is_err());
    /// ```
    pub fn from_coordinates(values: &[f64]) -> Result<Option<Self>, LatLngError> {
        match values {
            [] => Ok(None),
            [lat, lng] => Ok(Some(Self {
                lat: *lat,
                lng: *lng,
            })),
            other => Err(LatLngError::Length { len: other.len() }),
        }
    }
}

#[cfg(feature = "serde")]
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(feature = "serde")]
mod lat_lng_array {
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

    use super::LatLng;

    pub(super) fn serialize<S: Serializer>(
        value: &Option<LatLng>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let coordinates: Vec<f64> = value
            .map(|point| vec![point.lat, point.lng])
            .unwrap_or_default();
        coordinates.serialize(serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<LatLng>, D::Error> {
        let raw = Option::<Vec<f64>>::deserialize(deserializer)?.unwrap_or_default();
        LatLng::from_coordinates(&raw).map_err(D::Error::custom)
    }
}
