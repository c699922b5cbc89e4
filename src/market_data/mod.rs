// Market data module entrypoint
pub mod adapters;       // page snapshot fetchers (HTTP table, headless-browser command)
pub mod fields;         // cell text -> tvl / token / capacity
pub mod html;           // table cell extraction for server-rendered pages
pub mod normaliser;     // raw rows -> canonical snapshot
