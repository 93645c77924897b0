//! Class and object bodies carrying the required fields of each pass type.

use serde_json::{json, Map, Value};

use crate::pass::{resource_id, ObjectState, PassClass, PassObject, PassType};

const ISSUER_NAME: &str = "Issuer name";
const REVIEW_STATUS: &str = "UNDER_REVIEW";
const LOGO_URI: &str =
    "https://storage.googleapis.com/wallet-lab-tools-codelab-artifacts-public/pass_google_logo.jpg";
const HERO_IMAGE_URI: &str = "https://farm4.staticflickr.com/3723/11177041115_6e6a3b6f49_o.jpg";

fn localized(value: &str) -> Value {
    json!({
        "defaultValue": {
            "language": "en-US",
            "value": value
        }
    })
}

fn image(uri: &str, description: &str) -> Value {
    json!({
        "sourceUri": { "uri": uri },
        "contentDescription": localized(description)
    })
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Builds a new class for `pass_type` with id `<issuer_id>.<class_suffix>`.
pub fn new_class(pass_type: PassType, issuer_id: &str, class_suffix: &str) -> PassClass {
    let mut fields = match pass_type {
        PassType::EventTicket => into_map(json!({
            "eventName": localized("Event name"),
        })),
        PassType::Flight => into_map(json!({
            "localScheduledDepartureDateTime": "2023-07-02T15:30:00",
            "flightHeader": {
                "carrier": { "carrierIataCode": "LX" },
                "flightNumber": "123"
            },
            "origin": { "airportIataCode": "LAX", "terminal": "1", "gate": "A2" },
            "destination": { "airportIataCode": "SFO", "terminal": "2", "gate": "C3" }
        })),
        PassType::Generic => Map::new(),
        PassType::GiftCard => Map::new(),
        PassType::Loyalty => into_map(json!({
            "programName": "Program name",
            "programLogo": image(LOGO_URI, "Logo description"),
        })),
        PassType::Offer => into_map(json!({
            "provider": "Provider name",
            "title": "Offer title",
            "redemptionChannel": "ONLINE"
        })),
        PassType::Transit => into_map(json!({
            "logo": image(LOGO_URI, "Logo description"),
            "transitType": "BUS"
        })),
    };

    // generic classes carry nothing but their id
    if pass_type != PassType::Generic {
        fields.insert("issuerName".to_owned(), json!(ISSUER_NAME));
        fields.insert("reviewStatus".to_owned(), json!(REVIEW_STATUS));
    }

    PassClass {
        pass_type,
        id: resource_id(issuer_id, class_suffix),
        fields,
    }
}

/// Builds a new active object for `pass_type` referencing `<issuer_id>.<class_suffix>`.
pub fn new_object(
    pass_type: PassType,
    issuer_id: &str,
    class_suffix: &str,
    object_suffix: &str,
) -> PassObject {
    let mut fields = match pass_type {
        PassType::EventTicket => into_map(json!({
            "seatInfo": {
                "seat": localized("42"),
                "row": localized("G3"),
                "section": localized("5"),
                "gate": localized("A")
            },
            "ticketHolderName": "Ticket holder name",
            "ticketNumber": "Ticket number"
        })),
        PassType::Flight => into_map(json!({
            "passengerName": "Passenger name",
            "boardingAndSeatingInfo": { "boardingGroup": "B", "seatNumber": "42" },
            "reservationInfo": { "confirmationCode": "Confirmation code" }
        })),
        PassType::Generic => into_map(json!({
            "cardTitle": localized("Generic card title"),
            "header": localized("Generic header"),
            "hexBackgroundColor": "#4285f4",
            "logo": image(LOGO_URI, "Generic card logo")
        })),
        PassType::GiftCard => into_map(json!({
            "cardNumber": "Card number",
            "pin": "1234",
            "balance": { "micros": 20000000, "currencyCode": "USD" },
            "balanceUpdateTime": { "date": "2020-04-12T16:20:50.52-04:00" }
        })),
        PassType::Loyalty => into_map(json!({
            "accountId": "Account id",
            "accountName": "Account name",
            "loyaltyPoints": { "balance": { "int": 800 }, "label": "Points" }
        })),
        PassType::Offer => into_map(json!({
            "validTimeInterval": {
                "start": { "date": "2023-06-12T23:20:50.52Z" },
                "end": { "date": "2023-12-12T23:20:50.52Z" }
            }
        })),
        PassType::Transit => into_map(json!({
            "passengerType": "SINGLE_PASSENGER",
            "passengerNames": "Passenger names",
            "tripType": "ONE_WAY",
            "ticketLeg": {
                "originStationCode": "LA",
                "originName": localized("Origin name"),
                "destinationStationCode": "SFO",
                "destinationName": localized("Destination name"),
                "departureDateTime": "2020-04-12T16:20:50.52Z",
                "arrivalDateTime": "2020-04-12T20:20:50.52Z",
                "fareName": localized("Fare name")
            }
        })),
    };

    fields.insert("state".to_owned(), json!(ObjectState::Active));
    fields.insert(
        "heroImage".to_owned(),
        image(HERO_IMAGE_URI, "Hero image description"),
    );
    fields.insert(
        "barcode".to_owned(),
        json!({ "type": "QR_CODE", "value": "QR code" }),
    );

    PassObject {
        pass_type,
        id: resource_id(issuer_id, object_suffix),
        class_id: resource_id(issuer_id, class_suffix),
        fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_type_has_class_and_object() {
        for pass_type in PassType::ALL {
            let class = new_class(pass_type, "3388", "cls");
            let object = new_object(pass_type, "3388", "cls", "obj");

            assert_eq!(class.id, "3388.cls");
            assert_eq!(object.id, "3388.obj");
            assert_eq!(object.class_id, class.id);
            assert_eq!(object.pass_type, pass_type);
            assert_eq!(object.fields["state"], json!("ACTIVE"));
        }
    }

    #[test]
    fn generic_class_is_bare() {
        let class = new_class(PassType::Generic, "1", "c");
        assert_eq!(serde_json::to_value(&class).unwrap(), json!({"id": "1.c"}));
    }

    #[test]
    fn loyalty_required_fields() {
        let class = serde_json::to_value(new_class(PassType::Loyalty, "1", "c")).unwrap();
        assert_eq!(class["programName"], json!("Program name"));
        assert_eq!(class["reviewStatus"], json!("UNDER_REVIEW"));

        let object = serde_json::to_value(new_object(PassType::Loyalty, "1", "c", "o")).unwrap();
        assert_eq!(object["loyaltyPoints"]["balance"]["int"], json!(800));
        assert_eq!(object["classId"], json!("1.c"));
    }
}
