//! Remote content providers the router delegates to

mod conversation;
mod weather;

pub use conversation::{
    ChatCompletionsProvider, ConversationProvider, GenerationParams, UnavailableConversation,
};
pub use weather::{
    KNOWN_LOCALITIES, Locality, OpenWeatherProvider, UnavailableWeather, WeatherProvider,
    display_name,
};
