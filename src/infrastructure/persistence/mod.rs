pub mod csv_series_store;

pub use csv_series_store::CsvSeriesStore;
