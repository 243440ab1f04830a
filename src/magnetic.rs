use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use world_magnetic_model::{
    time::Date,
    uom::si::{
        angle::degree,
        f32::{Angle, Length},
        length::meter,
        magnetic_flux_density::microtesla,
    },
    GeomagneticField,
};

use crate::geo::GeoCoordinate;

/// Earth's magnetic field at a location, from the World Magnetic Model.
#[derive(Deserialize, Serialize, Clone, Copy, Default, Debug, PartialEq)]
pub struct MagneticData {
    /// in degrees, positive east of true north
    pub declination: f64,
    /// in degrees
    pub inclination: f64,
    /// in µT
    pub magnetic_flux_density: f64,
}

impl MagneticData {
    /// Field at sea level for `position` on `date`.
    ///
    /// `None` when the date lies outside the model's validity window.
    pub fn at(position: GeoCoordinate, date: NaiveDate) -> Option<Self> {
        let date = Date::from_ordinal_date(date.year(), date.ordinal() as u16).ok()?;
        let field = GeomagneticField::new(
            Length::new::<meter>(0.0),
            Angle::new::<degree>(position.latitude as f32),
            Angle::new::<degree>(position.longitude as f32),
            date,
        )
        .ok()?;

        Some(Self {
            declination: field.declination().get::<degree>().into(),
            inclination: field.inclination().get::<degree>().into(),
            magnetic_flux_density: field.f().get::<microtesla>().into(),
        })
    }

    /// Field at `position` for today's UTC date.
    pub fn today(position: GeoCoordinate) -> Option<Self> {
        Self::at(position, chrono::Utc::now().date_naive())
    }
}
