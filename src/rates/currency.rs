//! Static catalog of currencies offered by the converter
//!
//! Codes follow the API's pair keys. `USDT` and `EURT` are the tourism
//! (cash) variants of the dollar and the euro.

/// A currency the converter knows how to display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Currency {
    /// Code used in rate pair keys
    pub code: &'static str,
    /// Display symbol
    pub symbol: &'static str,
    /// Human-readable name
    pub name: &'static str,
}

/// Static array of all supported currencies
///
/// Majors first, then South America, then Central America and the Caribbean.
pub static CURRENCIES: [Currency; 21] = [
    Currency { code: "BRL", symbol: "R$", name: "Brazilian Real" },
    Currency { code: "USD", symbol: "US$", name: "US Dollar" },
    Currency { code: "USDT", symbol: "US$", name: "US Dollar (tourism)" },
    Currency { code: "EUR", symbol: "€", name: "Euro" },
    Currency { code: "EURT", symbol: "€", name: "Euro (tourism)" },
    Currency { code: "BTC", symbol: "₿", name: "Bitcoin" },
    Currency { code: "ARS", symbol: "ARS$", name: "Argentine Peso" },
    Currency { code: "CLP", symbol: "CLP$", name: "Chilean Peso" },
    Currency { code: "COP", symbol: "COP$", name: "Colombian Peso" },
    Currency { code: "PEN", symbol: "S/", name: "Peruvian Sol" },
    Currency { code: "UYU", symbol: "UYU$", name: "Uruguayan Peso" },
    Currency { code: "PYG", symbol: "₲", name: "Paraguayan Guarani" },
    Currency { code: "BOB", symbol: "Bs", name: "Bolivian Boliviano" },
    Currency { code: "VES", symbol: "Bs.S", name: "Venezuelan Bolívar" },
    Currency { code: "MXN", symbol: "MXN$", name: "Mexican Peso" },
    Currency { code: "CRC", symbol: "₡", name: "Costa Rican Colón" },
    Currency { code: "GTQ", symbol: "Q", name: "Guatemalan Quetzal" },
    Currency { code: "HNL", symbol: "L", name: "Honduran Lempira" },
    Currency { code: "NIO", symbol: "C$", name: "Nicaraguan Córdoba" },
    Currency { code: "PAB", symbol: "B/", name: "Panamanian Balboa" },
    Currency { code: "DOP", symbol: "RD$", name: "Dominican Peso" },
];

/// Returns all supported currencies
pub fn all_currencies() -> &'static [Currency] {
    &CURRENCIES
}

/// Looks up a currency by its exact code
pub fn get_currency(code: &str) -> Option<&'static Currency> {
    CURRENCIES.iter().find(|currency| currency.code == code)
}
