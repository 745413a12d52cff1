pub mod coindcx;
