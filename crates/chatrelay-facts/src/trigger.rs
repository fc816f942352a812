//! Best-effort keyword detection of real-time data requests in free text.
//!
//! Deliberately a standalone, testable classifier: the prompt composer takes
//! an already-resolved fact, it never runs these rules itself.

use crate::FactCategory;

const WEATHER_WORDS: &[&str] = &["weather", "temperature", "forecast", "rain", "sunny", "humidity"];
const TIME_WORDS: &[&str] = &["what time", "current time", "time is it", "timezone", "clock"];
const CRYPTO_WORDS: &[&str] = &["bitcoin", "btc", "ethereum", "eth", "crypto", "dogecoin"];
const NEWS_WORDS: &[&str] = &["news", "headlines", "breaking", "latest stories"];
const STOCKS_WORDS: &[&str] = &["stock", "share price", "nasdaq", "ticker", "dow jones"];

/// Cities we can resolve to a weather/time location without geocoding.
const KNOWN_CITIES: &[&str] = &[
    "london", "paris", "berlin", "madrid", "rome", "moscow", "istanbul", "dubai", "mumbai",
    "singapore", "tokyo", "seoul", "beijing", "sydney", "new york", "chicago", "los angeles",
    "toronto", "mexico city", "sao paulo", "cairo", "lagos",
];

/// Pick at most one category for a message, first match wins in
/// `FactCategory` declaration order. `None` means the prompt goes out
/// unaugmented.
pub fn classify(message: &str) -> Option<FactCategory> {
    let text = message.to_lowercase();
    let words_for = |category: FactCategory| -> &[&str] {
        match category {
            FactCategory::Weather => WEATHER_WORDS,
            FactCategory::Time => TIME_WORDS,
            FactCategory::Crypto => CRYPTO_WORDS,
            FactCategory::News => NEWS_WORDS,
            FactCategory::Stocks => STOCKS_WORDS,
        }
    };

    FactCategory::ALL
        .iter()
        .copied()
        .find(|&c| words_for(c).iter().any(|w| text.contains(w)))
}

/// Case-insensitive scan for a known city name, used as the location
/// parameter for weather and time lookups.
pub fn detect_city(message: &str) -> Option<&'static str> {
    let text = message.to_lowercase();
    KNOWN_CITIES.iter().copied().find(|city| text.contains(city))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weather_keywords_match() {
        assert_eq!(classify("What's the weather like?"), Some(FactCategory::Weather));
        assert_eq!(classify("FORECAST for tomorrow"), Some(FactCategory::Weather));
    }

    #[test]
    fn priority_order_weather_first() {
        // Mentions both weather and bitcoin; weather declared first, wins.
        assert_eq!(
            classify("will rain affect the bitcoin conference"),
            Some(FactCategory::Weather)
        );
    }

    #[test]
    fn each_category_reachable() {
        assert_eq!(classify("what time is it in tokyo"), Some(FactCategory::Time));
        assert_eq!(classify("price of ethereum today"), Some(FactCategory::Crypto));
        assert_eq!(classify("any breaking headlines?"), Some(FactCategory::News));
        assert_eq!(classify("how is the nasdaq doing"), Some(FactCategory::Stocks));
    }

    #[test]
    fn no_match_is_none() {
        assert_eq!(classify("tell me a joke"), None);
    }

    #[test]
    fn city_detection_case_insensitive() {
        assert_eq!(detect_city("weather in LONDON please"), Some("london"));
        assert_eq!(detect_city("weather in New York"), Some("new york"));
        assert_eq!(detect_city("weather in Gotham"), None);
    }
}
